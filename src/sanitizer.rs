//! Redaction and size bounding for code that leaves the machine.
//!
//! Passes run in a fixed order: literal secrets, e-mail addresses, phone-like
//! digit runs, oversized literals, then a whole-text length guard. Everything
//! here is pure; the only state is the compiled rule set.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SanitizerConfig;

pub const SECRET_MARKER: &str = "/* sanitized */";
pub const EMAIL_PLACEHOLDER: &str = "[email_hidden]";
pub const PHONE_PLACEHOLDER: &str = "[number_hidden]";
pub const LITERAL_PLACEHOLDER: &str = "\"[...truncated_literal...]\"";
pub const OBJECT_PLACEHOLDER: &str = "{/* ...truncated_literal... */}";
pub const LENGTH_MARKER: &str = "\n/* ...truncated for safety... */";

pub const NOTE_SANITIZED: &str = "sanitized";
pub const NOTE_SAFE: &str = "safe";

/// Result of a sanitize run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedCode {
    pub safe_code: String,
    /// Names of the rules that fired. Never the redacted values.
    pub removed_patterns: Vec<String>,
    pub truncated: bool,
    pub note: String,
}

/// A named literal-secret pattern.
#[derive(Debug, Clone, Copy)]
pub struct SecretRule {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// Assignments or properties whose key names a credential and whose value is
/// a quoted literal. The closing quote must match the opening one. Comparisons
/// (`==`) do not match.
pub static SECRET_RULES: &[SecretRule] = &[
    SecretRule { name: "api_key", pattern: r#"(?i)[\w$]*api[_-]?key[\w$]*\s*[:=]\s*(?:"[^"\n]+"|'[^'\n]+'|`[^`]+`)"# },
    SecretRule { name: "token", pattern: r#"(?i)[\w$]*token[\w$]*\s*[:=]\s*(?:"[^"\n]+"|'[^'\n]+'|`[^`]+`)"# },
    SecretRule { name: "password", pattern: r#"(?i)[\w$]*(?:password|passwd)[\w$]*\s*[:=]\s*(?:"[^"\n]+"|'[^'\n]+'|`[^`]+`)"# },
    SecretRule { name: "connection_string", pattern: r#"(?i)[\w$]*connection[_-]?string[\w$]*\s*[:=]\s*(?:"[^"\n]+"|'[^'\n]+'|`[^`]+`)"# },
];

static EMAIL_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"));
static PHONE_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\+?\d[\d -]{7,}\d"));

static DEFAULT_SANITIZER: Lazy<Sanitizer> = Lazy::new(Sanitizer::default);

struct CompiledSecret {
    name: &'static str,
    re: Regex,
}

/// Compiled rule set plus thresholds.
pub struct Sanitizer {
    secrets: Vec<CompiledSecret>,
    literals: Vec<Regex>,
    objects: Option<Regex>,
    max_length: usize,
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer")
            .field("secret_rules", &self.secrets.len())
            .field("max_length", &self.max_length)
            .finish()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&SanitizerConfig::default())
    }
}

impl Sanitizer {
    pub fn new(config: &SanitizerConfig) -> Self {
        let secrets = SECRET_RULES
            .iter()
            .filter_map(|rule| match Regex::new(rule.pattern) {
                Ok(re) => Some(CompiledSecret { name: rule.name, re }),
                Err(e) => {
                    tracing::warn!(rule = rule.name, error = %e, "secret rule failed to compile");
                    None
                }
            })
            .collect();

        // one regex per quote style; only backticks may span lines
        let n = config.literal_threshold + 1;
        let literals = [
            format!(r#""(?:[^"\\\n]|\\.){{{n},}}""#),
            format!(r#"'(?:[^'\\\n]|\\.){{{n},}}'"#),
            format!(r#"(?s)`(?:[^`\\]|\\.){{{n},}}`"#),
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

        let objects = Regex::new(&format!(
            r"([=:(,\[]\s*)\{{[^{{}};]{{{},}}\}}",
            config.literal_threshold
        ))
        .ok();

        Self {
            secrets,
            literals,
            objects,
            max_length: config.max_length,
        }
    }

    /// Run every pass. Total and deterministic.
    pub fn sanitize(&self, code: &str) -> SanitizedCode {
        let (mut safe_code, removed_patterns) = self.redact(code);
        let mut truncated = false;

        // oversized literals
        for re in &self.literals {
            if re.is_match(&safe_code) {
                safe_code = re.replace_all(&safe_code, LITERAL_PLACEHOLDER).into_owned();
                truncated = true;
            }
        }
        if let Some(re) = &self.objects {
            if re.is_match(&safe_code) {
                let replacement = format!("${{1}}{OBJECT_PLACEHOLDER}");
                safe_code = re.replace_all(&safe_code, replacement.as_str()).into_owned();
                truncated = true;
            }
        }

        // length guard
        if safe_code.chars().count() > self.max_length {
            safe_code = self.cut_to_length(&safe_code);
            truncated = true;
        }

        let note = if removed_patterns.is_empty() && !truncated {
            NOTE_SAFE
        } else {
            NOTE_SANITIZED
        };

        SanitizedCode {
            safe_code,
            removed_patterns,
            truncated,
            note: note.to_string(),
        }
    }

    /// Secret, e-mail and phone passes only. No truncation.
    pub fn redact(&self, code: &str) -> (String, Vec<String>) {
        let mut text = code.to_string();
        let mut fired = Vec::new();

        for rule in &self.secrets {
            if rule.re.is_match(&text) {
                text = rule.re.replace_all(&text, SECRET_MARKER).into_owned();
                fired.push(rule.name.to_string());
            }
        }
        if let Ok(re) = EMAIL_RE.as_ref() {
            if re.is_match(&text) {
                text = re.replace_all(&text, EMAIL_PLACEHOLDER).into_owned();
                fired.push("email".to_string());
            }
        }
        if let Ok(re) = PHONE_RE.as_ref() {
            if re.is_match(&text) {
                text = re.replace_all(&text, PHONE_PLACEHOLDER).into_owned();
                fired.push("phone".to_string());
            }
        }
        (text, fired)
    }

    /// Keep a prefix so that prefix + marker fits in `max_length` chars.
    fn cut_to_length(&self, code: &str) -> String {
        let marker_len = LENGTH_MARKER.chars().count();
        if self.max_length <= marker_len {
            return LENGTH_MARKER.chars().take(self.max_length).collect();
        }
        let mut out: String = code.chars().take(self.max_length - marker_len).collect();
        out.push_str(LENGTH_MARKER);
        out
    }
}

/// Sanitize with default thresholds.
pub fn sanitize(code: &str) -> SanitizedCode {
    DEFAULT_SANITIZER.sanitize(code)
}

/// Redact with the default rule set.
pub fn redact(code: &str) -> String {
    DEFAULT_SANITIZER.redact(code).0
}
