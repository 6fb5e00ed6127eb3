//! The structured review result and the projection into it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RouteLensError;

pub const DEFAULT_SUMMARY: &str = "No summary provided.";
pub const DEFAULT_NOTES: &str = "No notes provided.";

/// One issue or suggestion. Reviewers return either plain sentences or
/// objects with a `description` and whatever else they felt like adding.
///
/// Any other item (number, bool, array) is kept as `Text` holding its JSON
/// rendering, so `[1, 2]` comes back as `["1", "2"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finding {
    Text(String),
    Structured(Map<String, Value>),
}

impl Finding {
    /// Human-readable line: the text, the `description` field, or the JSON.
    pub fn description(&self) -> String {
        match self {
            Finding::Text(text) => text.clone(),
            Finding::Structured(map) => match map.get("description") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                _ => Value::Object(map.clone()).to_string(),
            },
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => Finding::Text(s),
            Value::Object(map) => Finding::Structured(map),
            other => Finding::Text(other.to_string()),
        }
    }
}

/// A fully populated review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub summary: String,
    pub issues: Vec<Finding>,
    pub suggestions: Vec<Finding>,
    pub before_after: Option<String>,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted: Option<String>,
}

/// What the rest of the system sees of a reply: a complete insight or an
/// error, never something in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedInsight {
    Insight(Insight),
    Failure(InsightFailure),
}

impl NormalizedInsight {
    pub fn failure(error: impl Into<String>, extracted: Option<String>) -> Self {
        NormalizedInsight::Failure(InsightFailure {
            error: error.into(),
            extracted,
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, NormalizedInsight::Failure(_))
    }

    /// Failures become [`RouteLensError::UnparsableReply`] carrying the error text.
    pub fn into_result(self) -> crate::Result<Insight> {
        match self {
            NormalizedInsight::Insight(insight) => Ok(insight),
            NormalizedInsight::Failure(failure) => Err(RouteLensError::UnparsableReply(failure.error)),
        }
    }

    pub fn as_insight(&self) -> Option<&Insight> {
        match self {
            NormalizedInsight::Insight(insight) => Some(insight),
            NormalizedInsight::Failure(_) => None,
        }
    }
}

/// Fill every field, applying defaults for what the reviewer left out.
pub fn project(parsed: Map<String, Value>) -> Insight {
    let mut parsed = parsed;
    Insight {
        summary: text_or(parsed.remove("summary"), DEFAULT_SUMMARY),
        issues: findings(parsed.remove("issues")),
        suggestions: findings(parsed.remove("suggestions")),
        before_after: before_after(parsed.remove("before_after")),
        notes: text_or(parsed.remove("notes"), DEFAULT_NOTES),
    }
}

fn text_or(value: Option<Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Null) | Some(Value::String(_)) | None => default.to_string(),
        Some(other) => other.to_string(),
    }
}

fn findings(value: Option<Value>) -> Vec<Finding> {
    match value {
        Some(Value::Array(items)) => items.into_iter().map(Finding::from_value).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(other) => vec![Finding::from_value(other)],
    }
}

fn before_after(value: Option<Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s,
        Value::Null => return None,
        Value::Object(map) => {
            match (map.get("before").and_then(Value::as_str), map.get("after").and_then(Value::as_str)) {
                (Some(before), Some(after)) => format!("Before:\n{before}\n\nAfter:\n{after}"),
                _ => serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_default(),
            }
        }
        other => other.to_string(),
    };
    let cleaned = present_code(&text);
    (!cleaned.is_empty()).then_some(cleaned)
}

static FENCE_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+-]*"));

/// Unescape leftover `\n` / `\"` sequences and drop code fences.
pub fn present_code(text: &str) -> String {
    let unescaped = text
        .replace("\\\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\\"", "\"");
    let defenced = match FENCE_RE.as_ref() {
        Ok(re) => re.replace_all(&unescaped, "").into_owned(),
        Err(_) => unescaped.replace("```", ""),
    };
    defenced.trim().to_string()
}
