//! Ordered parse strategies. Each one either produces an object or hands
//! the text on to the next.

use serde_json::{Map, Value};

use super::repair::lenient_rewrite;

#[derive(Debug, Clone, PartialEq)]
pub enum Recovery {
    Parsed(Map<String, Value>),
    /// Try the next strategy. Carries the reason for logging.
    Next(String),
}

pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Must not panic on any input.
    fn attempt(&self, text: &str) -> Recovery;
}

/// The repaired text as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictParse;

impl RecoveryStrategy for StrictParse {
    fn name(&self) -> &'static str {
        "strict"
    }

    fn attempt(&self, text: &str) -> Recovery {
        parse_object(text)
    }
}

/// Quote keys, normalize quotes and literals, then parse once more.
#[derive(Debug, Default, Clone, Copy)]
pub struct LenientParse;

impl RecoveryStrategy for LenientParse {
    fn name(&self) -> &'static str {
        "lenient"
    }

    fn attempt(&self, text: &str) -> Recovery {
        parse_object(&lenient_rewrite(text))
    }
}

fn parse_object(text: &str) -> Recovery {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Recovery::Parsed(map),
        Ok(other) => Recovery::Next(format!("expected an object, got {}", kind(&other))),
        Err(e) => Recovery::Next(e.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Strict first, then lenient.
pub fn default_chain() -> Vec<Box<dyn RecoveryStrategy>> {
    vec![Box::new(StrictParse), Box::new(LenientParse)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_rejects_non_objects() {
        assert!(matches!(StrictParse.attempt("[1,2]"), Recovery::Next(reason) if reason.contains("array")));
        assert!(matches!(StrictParse.attempt("{'a': 1}"), Recovery::Next(_)));
        assert!(matches!(StrictParse.attempt(r#"{"a": 1}"#), Recovery::Parsed(_)));
    }

    #[test]
    fn test_lenient_recovers_js_object() {
        match LenientParse.attempt("{summary: 'ok', issues: [],}") {
            Recovery::Parsed(map) => {
                assert_eq!(map["summary"], "ok");
                assert!(map["issues"].as_array().unwrap().is_empty());
            }
            Recovery::Next(reason) => panic!("lenient failed: {reason}"),
        }
    }
}
