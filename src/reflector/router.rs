//! Router identifier detection.

use serde::{Deserialize, Serialize};
use tree_sitter::Node;

use crate::parser::helpers::{field_text, walk_preorder, Visit};

/// Conventional router identifier when none is constructed in the file.
pub const DEFAULT_ROUTER: &str = "router";

/// The local identifier routes are registered on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterBinding {
    pub name: String,
    /// false when the name is the configured default rather than found in source.
    pub detected: bool,
    /// 1-based line of the construction, when detected.
    pub line: Option<usize>,
}

impl RouterBinding {
    pub fn assumed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            detected: false,
            line: None,
        }
    }
}

/// Find the first `X = Router(...)` / `X = express.Router(...)` binding.
pub fn detect_router(root: &Node, source: &[u8], default_router: &str) -> RouterBinding {
    find_router_declarator(root, source).unwrap_or_else(|| RouterBinding::assumed(default_router))
}

fn find_router_declarator(root: &Node, source: &[u8]) -> Option<RouterBinding> {
    let mut found = None;
    walk_preorder(root, |node| {
        if node.kind() == "variable_declarator" {
            found = router_binding(node, source);
            if found.is_some() {
                return Visit::Stop;
            }
        }
        Visit::Descend
    });
    found
}

fn router_binding(declarator: &Node, source: &[u8]) -> Option<RouterBinding> {
    let name = declarator.child_by_field_name("name")?;
    if name.kind() != "identifier" {
        return None;
    }
    let value = declarator.child_by_field_name("value")?;
    if value.kind() != "call_expression" {
        return None;
    }
    let func = value.child_by_field_name("function")?;
    let constructs_router = match func.kind() {
        "identifier" => func.utf8_text(source).ok() == Some("Router"),
        "member_expression" => field_text(&func, "property", source) == Some("Router"),
        _ => false,
    };
    if !constructs_router {
        return None;
    }

    Some(RouterBinding {
        name: name.utf8_text(source).ok()?.to_string(),
        detected: true,
        line: Some(declarator.start_position().row + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_text, SupportedLanguage};

    fn detect(src: &str) -> RouterBinding {
        let tree = parse_text(SupportedLanguage::JavaScript, src).unwrap();
        detect_router(&tree.root_node(), src.as_bytes(), DEFAULT_ROUTER)
    }

    #[test]
    fn test_plain_router_call() {
        let binding = detect("import { Router } from 'express';\nconst userRouter = Router();");
        assert_eq!(binding.name, "userRouter");
        assert!(binding.detected);
        assert_eq!(binding.line, Some(2));
    }

    #[test]
    fn test_member_router_call_with_options() {
        let binding = detect("let r = express.Router({ mergeParams: true });");
        assert_eq!(binding.name, "r");
    }

    #[test]
    fn test_first_construction_wins() {
        let binding = detect("const a = Router();\nconst b = Router();");
        assert_eq!(binding.name, "a");
    }

    #[test]
    fn test_fallback_to_default() {
        let binding = detect("const app = express();\nconst x = makeRouter();");
        assert_eq!(binding, RouterBinding::assumed("router"));
    }
}
