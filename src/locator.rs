//
//  locator.rs
//  RouteLens
//
//  Handler locator. Finds the definition of a named handler in controller
//  source and returns its exact source slice.
//

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::error::{Result, RouteLensError};
use crate::parser::helpers::{field_text, has_async_keyword, is_function_value, walk_preorder, Visit};
use crate::parser::{parse_source, SupportedLanguage};

/// How the handler was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationForm {
    /// `function name() {}`
    FunctionDeclaration,
    /// `const name = () => {}` / `const name = function () {}`
    VariableBinding,
    /// `export const name = () => {}`
    NamedExport,
    /// `exports.name = () => {}` / `module.exports.name = ...`
    CommonJsExport,
}

/// Where a handler lives in its file. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: Option<PathBuf>,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// A handler's source, sliced verbatim from the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFunction {
    pub name: String,
    /// Exact bytes of the function between its start and end offsets.
    pub code: String,
    pub location: SourceLocation,
    pub is_async: bool,
    pub form: DeclarationForm,
}

impl ExtractedFunction {
    /// Identity of a handler: the file it came from and its name.
    pub fn identity(&self) -> (Option<&Path>, &str) {
        (self.location.file.as_deref(), &self.name)
    }
}

/// Locate `handler` in JavaScript source text.
///
/// `Ok(None)` means no matching definition; `Err(UnparsableSource)` means the
/// file is too broken to search.
pub fn locate(source: &str, handler: &str) -> Result<Option<ExtractedFunction>> {
    locate_with(source, handler, SupportedLanguage::JavaScript, None)
}

/// Locate `handler` in a file's source, picking the grammar from its extension.
pub fn locate_in_file(path: &Path, source: &str, handler: &str) -> Result<Option<ExtractedFunction>> {
    let lang = SupportedLanguage::from_path(path)
        .ok_or_else(|| RouteLensError::UnsupportedLanguage(path.to_path_buf()))?;
    locate_with(source, handler, lang, Some(path))
}

/// Read a controller file from disk and locate `handler` in it.
pub fn locate_on_disk(path: &Path, handler: &str) -> Result<Option<ExtractedFunction>> {
    if !path.exists() {
        return Err(RouteLensError::NotFound(path.display().to_string()));
    }
    let source = std::fs::read_to_string(path)?;
    locate_in_file(path, &source, handler)
}

pub fn locate_with(
    source: &str,
    handler: &str,
    lang: SupportedLanguage,
    path: Option<&Path>,
) -> Result<Option<ExtractedFunction>> {
    let display_path = path.unwrap_or_else(|| Path::new("<memory>"));
    if handler.is_empty() {
        return Ok(None);
    }

    let tree = parse_source(lang, source, display_path)?;
    let root = tree.root_node();

    let mut search = Search {
        handler,
        source: source.as_bytes(),
        found: None,
    };
    search.run(&root);

    match search.found {
        Some(hit) => {
            if root.has_error() {
                warn!(
                    file = %display_path.display(),
                    handler,
                    "source has syntax errors; handler extracted from recovered tree"
                );
            }
            Ok(Some(hit.into_extracted(handler, source, path)))
        }
        None if source_is_unusable(&root) => Err(RouteLensError::UnparsableSource {
            path: display_path.to_path_buf(),
            reason: "syntax errors prevent a structural search".to_string(),
        }),
        None => {
            warn!(file = %display_path.display(), handler, "handler not found");
            Ok(None)
        }
    }
}

/// A file counts as unparsable when tree-sitter could not recover any
/// clean top-level structure: the root itself is an error, or every
/// top-level node is damaged.
fn source_is_unusable(root: &Node) -> bool {
    if root.is_error() {
        return true;
    }
    if !root.has_error() {
        return false;
    }
    let count = root.named_child_count();
    count > 0
        && (0..count)
            .filter_map(|i| root.named_child(i))
            .all(|c| c.is_error() || c.is_missing() || c.has_error())
}

// ── Search ───────────────────────────────────────────────────────────────────

struct Hit<'t> {
    /// Node whose span becomes `code`.
    body: Node<'t>,
    /// Node whose span becomes the reported location.
    span: Node<'t>,
    is_async: bool,
    form: DeclarationForm,
}

impl<'t> Hit<'t> {
    fn into_extracted(self, name: &str, source: &str, path: Option<&Path>) -> ExtractedFunction {
        let start = self.body.start_byte();
        let end = self.body.end_byte();
        let code = source.get(start..end).unwrap_or_default().to_string();
        let from = self.span.start_position();
        let to = self.span.end_position();
        debug!(handler = name, start, end, form = ?self.form, "handler located");

        ExtractedFunction {
            name: name.to_string(),
            code,
            location: SourceLocation {
                file: path.map(Path::to_path_buf),
                start_line: from.row + 1,
                start_column: from.column + 1,
                end_line: to.row + 1,
                end_column: to.column + 1,
                start_byte: start,
                end_byte: end,
            },
            is_async: self.is_async,
            form: self.form,
        }
    }
}

/// Pre-order traversal that stops at the first definition of `handler`.
struct Search<'s, 't> {
    handler: &'s str,
    source: &'s [u8],
    found: Option<Hit<'t>>,
}

impl<'s, 't> Search<'s, 't> {
    fn run(&mut self, root: &Node<'t>) {
        walk_preorder(root, |node| match self.match_node(node) {
            Some(hit) => {
                self.found = Some(hit);
                Visit::Stop
            }
            None => Visit::Descend,
        });
    }

    fn match_node(&self, node: &Node<'t>) -> Option<Hit<'t>> {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                self.named(node)?;
                Some(Hit {
                    body: *node,
                    span: *node,
                    is_async: has_async_keyword(node),
                    form: DeclarationForm::FunctionDeclaration,
                })
            }
            "export_statement" => {
                // export function name() {} is picked up as a declaration below
                let decl = node.child_by_field_name("declaration")?;
                if !matches!(decl.kind(), "lexical_declaration" | "variable_declaration") {
                    return None;
                }
                let value = self.first_declarator_value(&decl)?;
                Some(Hit {
                    body: value,
                    span: *node,
                    is_async: has_async_keyword(&value),
                    form: DeclarationForm::NamedExport,
                })
            }
            "variable_declarator" => {
                self.named(node)?;
                let value = node.child_by_field_name("value")?;
                if !is_function_value(value.kind()) {
                    return None;
                }
                Some(Hit {
                    body: value,
                    span: *node,
                    is_async: has_async_keyword(&value),
                    form: DeclarationForm::VariableBinding,
                })
            }
            "assignment_expression" => {
                let left = node.child_by_field_name("left")?;
                let value = node.child_by_field_name("right")?;
                if !is_function_value(value.kind()) || !self.is_commonjs_export(&left) {
                    return None;
                }
                Some(Hit {
                    body: value,
                    span: *node,
                    is_async: has_async_keyword(&value),
                    form: DeclarationForm::CommonJsExport,
                })
            }
            _ => None,
        }
    }

    fn named(&self, node: &Node) -> Option<()> {
        (field_text(node, "name", self.source)? == self.handler).then_some(())
    }

    /// The first declarator of an exported declaration, when it binds our
    /// handler to a function value.
    fn first_declarator_value(&self, decl: &Node<'t>) -> Option<Node<'t>> {
        let declarator = (0..decl.named_child_count())
            .filter_map(|i| decl.named_child(i))
            .find(|c| c.kind() == "variable_declarator")?;
        self.named(&declarator)?;
        let value = declarator.child_by_field_name("value")?;
        is_function_value(value.kind()).then_some(value)
    }

    /// `exports.<handler>` or `module.exports.<handler>`
    fn is_commonjs_export(&self, left: &Node) -> bool {
        if left.kind() != "member_expression" {
            return false;
        }
        if field_text(left, "property", self.source) != Some(self.handler) {
            return false;
        }
        matches!(
            field_text(left, "object", self.source),
            Some("exports") | Some("module.exports")
        )
    }
}
