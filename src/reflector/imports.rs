//! Controller import discovery for router files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::parser::helpers::{field_text, named_children, string_literal_value, walk_preorder, Visit};
use crate::parser::{parse_text, SupportedLanguage};

/// Where a handler identifier used in a router file comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerImport {
    /// Name exported by the controller module (differs from the local name under `as`).
    pub imported: String,
    /// Module specifier as written, e.g. `../controllers/user.controller.js`.
    pub specifier: String,
}

/// Map local handler names to their controller imports.
///
/// Recognizes `import { a, b as c } from ".../controllers/x"` and
/// `const { a, b: c } = require(".../controllers/x")`. Only specifiers that
/// go through a `controllers/` directory are considered.
pub fn controller_imports(source: &str) -> HashMap<String, ControllerImport> {
    let mut imports = HashMap::new();
    if let Some(tree) = parse_text(SupportedLanguage::JavaScript, source) {
        collect(&tree.root_node(), source.as_bytes(), &mut imports);
    }
    imports
}

fn collect(root: &Node, source: &[u8], out: &mut HashMap<String, ControllerImport>) {
    walk_preorder(root, |node| {
        match node.kind() {
            "import_statement" => collect_es_import(node, source, out),
            "variable_declarator" => collect_require(node, source, out),
            _ => {}
        }
        Visit::Descend
    });
}

fn collect_es_import(node: &Node, source: &[u8], out: &mut HashMap<String, ControllerImport>) {
    let Some(specifier) = node
        .child_by_field_name("source")
        .and_then(|s| string_literal_value(&s, source))
    else {
        return;
    };
    if !is_controller_specifier(&specifier) {
        return;
    }

    let mut stack = vec![*node];
    while let Some(n) = stack.pop() {
        if n.kind() == "import_specifier" {
            let Some(imported) = field_text(&n, "name", source) else {
                continue;
            };
            let local = field_text(&n, "alias", source).unwrap_or(imported);
            out.insert(
                local.to_string(),
                ControllerImport {
                    imported: imported.to_string(),
                    specifier: specifier.clone(),
                },
            );
            continue;
        }
        stack.extend(named_children(&n));
    }
}

fn collect_require(node: &Node, source: &[u8], out: &mut HashMap<String, ControllerImport>) {
    let (Some(pattern), Some(value)) = (
        node.child_by_field_name("name"),
        node.child_by_field_name("value"),
    ) else {
        return;
    };
    if pattern.kind() != "object_pattern" || value.kind() != "call_expression" {
        return;
    }
    if field_text(&value, "function", source) != Some("require") {
        return;
    }
    let Some(specifier) = value
        .child_by_field_name("arguments")
        .and_then(|a| named_children(&a).into_iter().next())
        .and_then(|a| string_literal_value(&a, source))
    else {
        return;
    };
    if !is_controller_specifier(&specifier) {
        return;
    }

    for prop in named_children(&pattern) {
        let (imported, local) = match prop.kind() {
            "shorthand_property_identifier_pattern" => {
                let name = prop.utf8_text(source).unwrap_or("");
                (name, name)
            }
            "pair_pattern" => (
                field_text(&prop, "key", source).unwrap_or(""),
                field_text(&prop, "value", source).unwrap_or(""),
            ),
            _ => continue,
        };
        if imported.is_empty() || local.is_empty() {
            continue;
        }
        out.insert(
            local.to_string(),
            ControllerImport {
                imported: imported.to_string(),
                specifier: specifier.clone(),
            },
        );
    }
}

fn is_controller_specifier(specifier: &str) -> bool {
    specifier.contains("controllers/")
}
