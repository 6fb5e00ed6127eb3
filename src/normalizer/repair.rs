//! Text repairs applied before and during parsing.
//!
//! Every scanner here tracks whether it is inside a double-quoted string so
//! that reviewer prose such as `"use res.json() here"` is never rewritten.

use once_cell::sync::Lazy;
use regex::Regex;

static JSON_FENCE_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?is)```\s*json(.*?)```"));

/// Prefer a ```json fenced block, else the span from the first `{` to the
/// last `}`, else the text unchanged.
pub fn extract_candidate(text: &str) -> String {
    if let Ok(re) = JSON_FENCE_RE.as_ref() {
        if let Some(inner) = re.captures(text).and_then(|c| c.get(1)) {
            if !inner.as_str().trim().is_empty() {
                return inner.as_str().to_string();
            }
        }
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Strip fence residue and the `json` tag, cut prose around the outermost
/// braces, turn raw line breaks and tabs into spaces (escapes inside
/// strings), and drop trailing commas.
pub fn cleanup(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '`' if starts_with_at(&chars, i, "```") => i += 3,
            'j' | 'J' if is_json_word(&chars, i) => i += 4,
            '\r' | '\n' | '\t' => {
                out.push(' ');
                i += 1;
            }
            ',' if matches!(next_significant(&chars, i + 1), Some('}') | Some(']')) => i += 1,
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    let trimmed = match (out.find('{'), out.rfind('}')) {
        (Some(start), Some(end)) if end > start => out[start..=end].to_string(),
        (Some(start), _) => out[start..].to_string(),
        _ => out,
    };
    trimmed.trim().to_string()
}

/// Close whatever truncation left open: a dangling string first, then
/// brackets and braces in nesting order.
pub fn auto_close(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut fixed = text.to_string();
    if in_string {
        if escaped {
            fixed.pop();
        }
        fixed.push('"');
    }
    while let Some(closer) = stack.pop() {
        fixed.push(closer);
    }
    fixed
}

/// Second-chance rewrite toward strict JSON: single-quoted strings become
/// double-quoted, bare keys get quoted, `True/False/None/undefined` become
/// JSON literals, trailing commas go.
pub fn lenient_rewrite(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = string_end(&chars, i, '"');
                out.extend(&chars[i..end]);
                i = end;
            }
            '\'' => {
                let end = string_end(&chars, i, '\'');
                let body_end = if end > i + 1 && chars[end - 1] == '\'' { end - 1 } else { end };
                requote(&chars[i + 1..body_end], &mut out);
                i = end;
            }
            ',' if matches!(next_significant(&chars, i + 1), Some('}') | Some(']') | None) => i += 1,
            c if is_ident_start(c) => {
                let mut end = i + 1;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let word: String = chars[i..end].iter().collect();
                let is_key = next_significant(&chars, end) == Some(':')
                    && matches!(out.trim_end().chars().last(), Some('{') | Some(','));
                if is_key {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(match word.as_str() {
                        "True" => "true",
                        "False" => "false",
                        "None" | "undefined" => "null",
                        _ => word.as_str(),
                    });
                }
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Index just past the closing `quote` of the string opened at `start`,
/// or the end of input when it never closes.
fn string_end(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn requote(body: &[char], out: &mut String) {
    out.push('"');
    let mut i = 0;
    while i < body.len() {
        match body[i] {
            '\\' if body.get(i + 1) == Some(&'\'') => {
                out.push('\'');
                i += 2;
            }
            '\\' => {
                out.push('\\');
                if let Some(next) = body.get(i + 1) {
                    out.push(*next);
                }
                i += 2;
            }
            '"' => {
                out.push_str("\\\"");
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out.push('"');
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars[from.min(chars.len())..]
        .iter()
        .copied()
        .find(|c| !c.is_whitespace())
}

fn starts_with_at(chars: &[char], i: usize, pat: &str) -> bool {
    pat.chars().enumerate().all(|(k, p)| chars.get(i + k) == Some(&p))
}

/// A standalone, case-insensitive `json` token (fence tag residue).
fn is_json_word(chars: &[char], i: usize) -> bool {
    let word: String = chars.iter().skip(i).take(4).collect();
    if !word.eq_ignore_ascii_case("json") {
        return false;
    }
    let before_ok = i == 0 || !is_ident_char(chars[i - 1]);
    let after_ok = chars.get(i + 4).map_or(true, |c| !is_ident_char(*c));
    before_ok && after_ok
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
