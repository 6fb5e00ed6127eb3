//! Logic refiner: strips comments and debug output from an extracted handler
//! and computes a few descriptive signals over what remains.
//!
//! The signals in [`CodeSummary`] are approximate signals from pattern
//! matching, not semantic analysis. `hasDataAccess` fires on vocabulary
//! like `find`/`update`/`Model`, whatever the receiver actually is.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use tree_sitter::Node;

use crate::config::RefinerConfig;
use crate::locator::ExtractedFunction;
use crate::parser::helpers::{field_text, walk_preorder, Visit};
use crate::parser::{parse_text, SupportedLanguage};

/// Heuristic description of a refined handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSummary {
    pub name: String,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub line_count: usize,
    pub has_data_access: bool,
    pub has_loops: bool,
    pub has_try_catch: bool,
    pub has_response_handling: bool,
}

/// A handler with comments and debug statements removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedFunction {
    pub name: String,
    pub cleaned_code: String,
    pub summary: CodeSummary,
}

static LOOP_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\b(?:for|while)\s*\(|\bdo\s*\{"));
static TRY_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\btry\s*\{"));
static DATA_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\w*(?:model|query|find|insert|update|delete|aggregate|upsert|populate)\w*\s*\(|\b[A-Z]\w*Model\b|\bprisma\.|\bknex\b|\bdb\.",
    )
});
static RESPONSE_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| {
    Regex::new(r"\b(?:res|reply|response|ctx)\s*\.\s*(?:status|json|send|sendStatus|end|redirect|render|sendFile|download|body)\b")
});
static BLANK_RUN_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n)+"));
static BLOCK_COMMENT_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/"));
static LINE_COMMENT_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?m)(^|[^:\\])//.*$"));

fn detects(re: &Lazy<Result<Regex, regex::Error>>, text: &str) -> bool {
    re.as_ref().map(|r| r.is_match(text)).unwrap_or(false)
}

/// Refines extracted handlers. Holds only configuration.
#[derive(Debug, Clone)]
pub struct Refiner {
    log_receivers: Vec<String>,
}

impl Default for Refiner {
    fn default() -> Self {
        Self::new(&RefinerConfig::default())
    }
}

impl Refiner {
    pub fn new(config: &RefinerConfig) -> Self {
        Self {
            log_receivers: config
                .log_receivers
                .iter()
                .map(|r| r.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Clean an extracted handler. `None` only for missing or empty input.
    pub fn refine(&self, extracted: Option<&ExtractedFunction>) -> Option<RefinedFunction> {
        let Some(function) = extracted.filter(|f| !f.code.trim().is_empty()) else {
            warn!("no extracted function data provided");
            return None;
        };

        let lang = function
            .location
            .file
            .as_deref()
            .and_then(SupportedLanguage::from_path)
            .unwrap_or_default();

        let mut code = function.code.clone();

        // 1. comments
        match strip_comments(&code, lang) {
            Some(stripped) => code = stripped,
            None => warn!(handler = %function.name, "comment stripping failed, continuing with raw code"),
        }

        // 2. debug statements, plus any comments the grammar couldn't see
        match self.strip_log_statements(&code, lang) {
            Some(stripped) => code = stripped,
            None => warn!(handler = %function.name, "log statement removal failed, continuing"),
        }

        // 3. whitespace
        code = collapse_blank_lines(&code);

        let summary = summarize(&function.name, function.is_async, &code);
        Some(RefinedFunction {
            name: function.name.clone(),
            cleaned_code: code,
            summary,
        })
    }

    fn strip_log_statements(&self, code: &str, lang: SupportedLanguage) -> Option<String> {
        let tree = parse_text(lang, code)?;
        let root = tree.root_node();
        let mut ranges = Vec::new();
        self.collect_log_statements(&root, code.as_bytes(), &mut ranges);
        let stripped = remove_ranges(code, ranges);

        if root.has_error() {
            // recovered tree may have hidden statements inside ERROR nodes
            return Some(self.regex_sweep(&stripped));
        }
        Some(stripped)
    }

    fn collect_log_statements(&self, root: &Node, source: &[u8], out: &mut Vec<Range<usize>>) {
        walk_preorder(root, |node| {
            if node.kind() == "expression_statement" && self.is_log_call_statement(node, source) {
                out.push(node.start_byte()..node.end_byte());
                return Visit::Skip;
            }
            Visit::Descend
        });
    }

    /// `<receiver>.<lowercaseMethod>(...)` as a whole statement.
    fn is_log_call_statement(&self, stmt: &Node, source: &[u8]) -> bool {
        let Some(call) = stmt.named_child(0) else {
            return false;
        };
        if call.kind() != "call_expression" {
            return false;
        }
        let Some(func) = call.child_by_field_name("function") else {
            return false;
        };
        if func.kind() != "member_expression" {
            return false;
        }
        let receiver = field_text(&func, "object", source).unwrap_or("");
        let method = field_text(&func, "property", source).unwrap_or("");
        !method.is_empty()
            && method.chars().all(|c| c.is_ascii_lowercase())
            && self.is_log_receiver(receiver)
    }

    fn is_log_receiver(&self, receiver: &str) -> bool {
        let receiver = receiver.to_ascii_lowercase();
        self.log_receivers.iter().any(|r| *r == receiver)
    }

    /// Text-level fallback when the grammar could not make sense of the code.
    fn regex_sweep(&self, code: &str) -> String {
        let mut out = code.to_string();
        if !self.log_receivers.is_empty() {
            let receivers = self
                .log_receivers
                .iter()
                .map(|r| regex::escape(r))
                .collect::<Vec<_>>()
                .join("|");
            if let Ok(re) = Regex::new(&format!(r"(?i)\b(?:{receivers})\.[a-z]+\([^)]*\);?")) {
                out = re.replace_all(&out, "").into_owned();
            }
        }
        if let Ok(re) = BLOCK_COMMENT_RE.as_ref() {
            out = re.replace_all(&out, "").into_owned();
        }
        if let Ok(re) = LINE_COMMENT_RE.as_ref() {
            out = re.replace_all(&out, "$1").into_owned();
        }
        out
    }
}

/// Refine with default settings.
pub fn refine(extracted: Option<&ExtractedFunction>) -> Option<RefinedFunction> {
    Refiner::default().refine(extracted)
}

/// Remove every comment token the grammar recognizes.
fn strip_comments(code: &str, lang: SupportedLanguage) -> Option<String> {
    let tree = parse_text(lang, code)?;
    let mut ranges = Vec::new();
    collect_comments(&tree.root_node(), &mut ranges);
    Some(remove_ranges(code, ranges))
}

fn collect_comments(root: &Node, out: &mut Vec<Range<usize>>) {
    walk_preorder(root, |node| {
        if node.kind() == "comment" {
            out.push(node.start_byte()..node.end_byte());
        }
        Visit::Descend
    });
}

/// Cut byte ranges out of `code`. A range that is alone on its line takes
/// the whole line with it.
fn remove_ranges(code: &str, mut ranges: Vec<Range<usize>>) -> String {
    if ranges.is_empty() {
        return code.to_string();
    }
    let bytes = code.as_bytes();
    for range in ranges.iter_mut() {
        let line_start = code[..range.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = code[range.end..]
            .find('\n')
            .map(|i| range.end + i)
            .unwrap_or(code.len());
        let blank_before = bytes[line_start..range.start]
            .iter()
            .all(|b| *b == b' ' || *b == b'\t');
        let blank_after = bytes[range.end..line_end]
            .iter()
            .all(|b| b.is_ascii_whitespace());
        if blank_before && blank_after {
            range.start = line_start;
            range.end = (line_end + 1).min(code.len());
        }
    }

    ranges.sort_by_key(|r| r.start);
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    for range in ranges {
        if range.start < cursor {
            cursor = cursor.max(range.end);
            continue;
        }
        out.push_str(&code[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&code[cursor..]);
    out
}

/// Runs of blank lines become one blank line; outer whitespace is trimmed.
fn collapse_blank_lines(code: &str) -> String {
    match BLANK_RUN_RE.as_ref() {
        Ok(re) => re.replace_all(code, "\n\n").trim().to_string(),
        Err(_) => code.trim().to_string(),
    }
}

fn summarize(name: &str, is_async: bool, code: &str) -> CodeSummary {
    CodeSummary {
        name: name.to_string(),
        is_async,
        line_count: if code.is_empty() { 0 } else { code.lines().count() },
        has_data_access: detects(&DATA_RE, code),
        has_loops: detects(&LOOP_RE, code),
        has_try_catch: detects(&TRY_RE, code),
        has_response_handling: detects(&RESPONSE_RE, code),
    }
}
