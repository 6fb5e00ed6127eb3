//
//  helpers.rs
//  RouteLens
//

use tree_sitter::{Node, TreeCursor};

/// Get the full text of a node.
pub fn node_text(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}

/// Text of a named field child, if present.
pub fn field_text<'a>(node: &Node, field: &str, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .and_then(|n| n.utf8_text(source).ok())
}

/// Contents of a string or template-string literal node, without quotes.
///
/// Template strings with substitutions are returned verbatim between the backticks.
/// A literal left unterminated by error recovery yields `None`.
pub fn string_literal_value(node: &Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" | "template_string" => strip_quotes(node.utf8_text(source).ok()?),
        _ => None,
    }
}

/// Inner text of a literal whose first and last chars are the same quote.
fn strip_quotes(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|c| matches!(c, '"' | '\'' | '`'))?;
    text.strip_prefix(quote)?
        .strip_suffix(quote)
        .map(str::to_string)
}

/// What a [`walk_preorder`] visitor wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    /// Skip this node's children.
    Skip,
    Stop,
}

/// Pre-order walk over `root` and its descendants on a [`TreeCursor`].
/// Iterative, so nesting depth costs no stack.
pub fn walk_preorder<'t>(root: &Node<'t>, mut visit: impl FnMut(&Node<'t>) -> Visit) {
    let mut cursor: TreeCursor<'t> = root.walk();
    loop {
        let node = cursor.node();
        match visit(&node) {
            Visit::Stop => return,
            Visit::Descend if cursor.goto_first_child() => continue,
            _ => {}
        }
        // next sibling, or the nearest ancestor's next sibling
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Direct child tokens of `node`, named or not.
pub fn children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .collect()
}

/// Named children of `node`, skipping comments.
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    (0..node.named_child_count())
        .filter_map(|i| node.named_child(i))
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Function-valued node kinds across the JS and TS grammars.
pub fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// True if the node carries a direct `async` keyword token.
pub fn has_async_keyword(node: &Node) -> bool {
    children(node).iter().any(|c| c.kind() == "async")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_text, SupportedLanguage};

    #[test]
    fn test_string_literal_value() {
        let src = r#"f("/users", '/a', `/b/${id}`);"#;
        let tree = parse_text(SupportedLanguage::JavaScript, src).unwrap();
        let call = tree.root_node().named_child(0).unwrap().named_child(0).unwrap();
        let args = call.child_by_field_name("arguments").unwrap();
        let values: Vec<_> = named_children(&args)
            .iter()
            .filter_map(|n| string_literal_value(n, src.as_bytes()))
            .collect();
        assert_eq!(values, vec!["/users", "/a", "/b/${id}"]);
    }

    #[test]
    fn test_walk_preorder_order_skip_stop() {
        let src = "a(b(c)); d;";
        let tree = parse_text(SupportedLanguage::JavaScript, src).unwrap();
        let root = tree.root_node();

        let mut idents = Vec::new();
        walk_preorder(&root, |n| {
            if n.kind() == "identifier" {
                idents.push(node_text(n, src.as_bytes()));
            }
            Visit::Descend
        });
        assert_eq!(idents, vec!["a", "b", "c", "d"]);

        let mut idents = Vec::new();
        walk_preorder(&root, |n| {
            if n.kind() == "arguments" {
                return Visit::Skip;
            }
            if n.kind() == "identifier" {
                idents.push(node_text(n, src.as_bytes()));
            }
            Visit::Descend
        });
        assert_eq!(idents, vec!["a", "d"]);

        let mut seen = 0;
        walk_preorder(&root, |n| {
            if n.kind() == "identifier" {
                seen += 1;
                return Visit::Stop;
            }
            Visit::Descend
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_walk_preorder_deep_nesting() {
        let depth = 10_000;
        let src = format!("x = {}1{};", "[".repeat(depth), "]".repeat(depth));
        let tree = parse_text(SupportedLanguage::JavaScript, &src).unwrap();
        let mut arrays = 0;
        walk_preorder(&tree.root_node(), |n| {
            if n.kind() == "array" {
                arrays += 1;
            }
            Visit::Descend
        });
        assert_eq!(arrays, depth);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("'/a'").as_deref(), Some("/a"));
        assert_eq!(strip_quotes("\"\"").as_deref(), Some(""));
        assert_eq!(strip_quotes("'/é"), None);
        assert_eq!(strip_quotes("'/é\""), None);
        assert_eq!(strip_quotes("'"), None);
        assert_eq!(strip_quotes("plain"), None);
    }

    #[test]
    fn test_async_keyword() {
        let src = "const a = async () => 1; const b = () => 2;";
        let tree = parse_text(SupportedLanguage::JavaScript, src).unwrap();
        let root = tree.root_node();
        let value_of = |i: usize| {
            root.named_child(i)
                .unwrap()
                .named_child(0)
                .unwrap()
                .child_by_field_name("value")
                .unwrap()
        };
        assert!(has_async_keyword(&value_of(0)));
        assert!(!has_async_keyword(&value_of(1)));
    }
}
