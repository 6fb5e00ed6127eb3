//! Scan and package: endpoints, analyze

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::format::{format_analysis, format_scan};
use crate::config::RouteLensConfig;
use crate::pipeline::Pipeline;
use crate::storage::ReportStore;

/// Relative routes paths are taken from the project root.
pub(crate) fn in_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Print what the reflector sees in a routes file.
pub fn endpoints(config: &RouteLensConfig, root: &Path, routes_file: &Path) -> Result<()> {
    let routes_file = in_root(root, routes_file);
    let pipeline = Pipeline::new(config.clone(), root);
    let report = pipeline
        .scan_routes(&routes_file)
        .with_context(|| format!("reading {}", routes_file.display()))?;

    println!("{}", routes_file.display());
    print!("{}", format_scan(&report));
    Ok(())
}

/// Build a payload per endpoint and save the ones that succeed.
///
/// Endpoints that fail are listed, not fatal.
pub fn analyze(config: RouteLensConfig, root: &Path, routes_file: &Path, only: &[String]) -> Result<()> {
    let routes_file = in_root(root, routes_file);
    let store = ReportStore::new(config.payload_dir(root), config.insight_dir(root));
    let pipeline = Pipeline::new(config, root);

    let analysis = pipeline
        .analyze_routes(&routes_file, only)
        .with_context(|| format!("reading {}", routes_file.display()))?;

    if analysis.report.is_empty() {
        println!("No endpoints found in {}", routes_file.display());
        return Ok(());
    }

    let mut saved = Vec::new();
    for payload in analysis.payloads() {
        let path = store.save_payload(payload)?;
        saved.push((payload.endpoint.handler.clone(), path));
    }

    print!("{}", format_analysis(&analysis, &saved));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_analyze_writes_payloads() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("routes")).unwrap();
        fs::create_dir_all(root.join("controllers")).unwrap();
        fs::write(
            root.join("routes/health.routes.js"),
            "const router = express.Router();\nrouter.get('/health', healthCheck);\n",
        )
        .unwrap();
        fs::write(
            root.join("controllers/health.controller.js"),
            "export const healthCheck = (req, res) => res.json({ ok: true });\n",
        )
        .unwrap();

        let config = RouteLensConfig::default();
        analyze(config.clone(), root, Path::new("routes/health.routes.js"), &[]).unwrap();

        let store = ReportStore::new(config.payload_dir(root), config.insight_dir(root));
        let saved = store.list_payloads().unwrap();
        assert_eq!(saved.len(), 1);
        assert!(saved[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("healthCheck_"));
    }

    #[test]
    fn test_missing_routes_file() {
        let dir = tempdir().unwrap();
        let err = endpoints(&RouteLensConfig::default(), dir.path(), Path::new("nope.js")).unwrap_err();
        assert!(err.to_string().contains("nope.js"));
    }
}
