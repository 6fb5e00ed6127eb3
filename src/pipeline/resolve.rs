//! Finding the controller file a handler lives in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::reflector::ControllerImport;

/// Directories never searched for controllers.
const BUILTIN_IGNORE: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "coverage",
    "analysis_reports",
    "ai_reports",
];

const CONTROLLER_EXTENSIONS: &[&str] = &["js", "ts", "mjs", "cjs", "jsx", "tsx"];

/// Where a handler's code is expected, and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedController {
    pub path: PathBuf,
    /// Name to look up in the file. Differs from the handler for aliased imports.
    pub function: String,
}

fn is_builtin_ignored(path: &Path) -> bool {
    path.components().any(|c| match c {
        std::path::Component::Normal(name) => name
            .to_str()
            .map_or(false, |n| BUILTIN_IGNORE.contains(&n)),
        _ => false,
    })
}

/// `getUsers` -> `get`: everything before the first uppercase letter.
pub fn controller_prefix(handler: &str) -> String {
    handler
        .chars()
        .take_while(|c| !c.is_uppercase())
        .collect::<String>()
        .to_lowercase()
}

/// Import map first (relative to the routes file, or to the project root
/// for bare specifiers), then a project-wide search by file name.
pub fn resolve_controller(
    project_root: &Path,
    routes_file: &Path,
    handler: &str,
    imports: &HashMap<String, ControllerImport>,
) -> Option<ResolvedController> {
    if let Some(import) = imports.get(handler) {
        let base = if import.specifier.starts_with('.') {
            routes_file.parent().unwrap_or(project_root)
        } else {
            project_root
        };
        if let Some(path) = existing_module(&base.join(&import.specifier)) {
            debug!(handler, path = %path.display(), "controller resolved from import");
            return Some(ResolvedController {
                path,
                function: import.imported.clone(),
            });
        }
    }

    let path = find_controller(project_root, &controller_prefix(handler))?;
    debug!(handler, path = %path.display(), "controller found by name");
    Some(ResolvedController {
        path,
        function: handler.to_string(),
    })
}

/// The specifier as written, or with a JS-family extension added.
fn existing_module(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    CONTROLLER_EXTENSIONS
        .iter()
        .map(|ext| {
            let mut name = candidate.as_os_str().to_os_string();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        })
        .chain(CONTROLLER_EXTENSIONS.iter().map(|ext| candidate.join(format!("index.{ext}"))))
        .find(|p| p.is_file())
}

/// First `<prefix>.controller.<ext>` under `root`, in path order.
/// Respects .gitignore.
pub fn find_controller(root: &Path, prefix: &str) -> Option<PathBuf> {
    if prefix.is_empty() {
        return None;
    }
    let wanted: Vec<String> = CONTROLLER_EXTENSIONS
        .iter()
        .map(|ext| format!("{prefix}.controller.{ext}"))
        .collect();

    let mut matches: Vec<PathBuf> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| !is_builtin_ignored(entry.path()))
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map_or(false, |name| wanted.iter().any(|w| w == name))
        })
        .map(|entry| entry.into_path())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "export function x() {}").unwrap();
    }

    #[test]
    fn test_prefix() {
        assert_eq!(controller_prefix("getUsers"), "get");
        assert_eq!(controller_prefix("testHandler"), "test");
        assert_eq!(controller_prefix("health"), "health");
        assert_eq!(controller_prefix("Users"), "");
    }

    #[test]
    fn test_relative_import_with_and_without_extension() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let routes = root.join("src/routes/user.routes.js");
        touch(&routes);
        touch(&root.join("src/controllers/user.controller.js"));

        let mut imports = HashMap::new();
        imports.insert(
            "listUsers".to_string(),
            ControllerImport {
                imported: "getUsers".into(),
                specifier: "../controllers/user.controller".into(),
            },
        );

        let resolved = resolve_controller(root, &routes, "listUsers", &imports).unwrap();
        assert!(resolved.path.ends_with("src/routes/../controllers/user.controller.js"));
        assert_eq!(resolved.function, "getUsers");
    }

    #[test]
    fn test_bare_specifier_from_project_root() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("controllers/auth.controller.js"));
        let mut imports = HashMap::new();
        imports.insert(
            "login".to_string(),
            ControllerImport {
                imported: "login".into(),
                specifier: "controllers/auth.controller.js".into(),
            },
        );
        let resolved =
            resolve_controller(root, &root.join("routes/auth.js"), "login", &imports).unwrap();
        assert_eq!(resolved.path, root.join("controllers/auth.controller.js"));
    }

    #[test]
    fn test_fallback_search_skips_node_modules() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("node_modules/pkg/test.controller.js"));
        touch(&root.join("src/controllers/test.controller.js"));

        let resolved =
            resolve_controller(root, &root.join("routes/r.js"), "testHandler", &HashMap::new())
                .unwrap();
        assert_eq!(resolved.path, root.join("src/controllers/test.controller.js"));
        assert_eq!(resolved.function, "testHandler");
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempdir().unwrap();
        assert!(resolve_controller(dir.path(), &dir.path().join("r.js"), "getX", &HashMap::new()).is_none());
    }
}
