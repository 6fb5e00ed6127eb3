//! Transport-level unwrapping: provider envelopes and stacked escaping.

use serde_json::Value;
use tracing::debug;

/// Places where providers put the generated text.
const TEXT_POINTERS: &[&str] = &[
    "/candidates/0/content/parts/0/text",
    "/response/candidates/0/content/parts/0/text",
    "/candidates/0/content/text",
    "/choices/0/message/content",
    "/choices/0/text",
];

/// If `raw` is a provider response document, return the generated text
/// inside it. A reply that is itself a JSON string literal is decoded once.
/// Anything else passes through.
pub fn unwrap_envelope(raw: &str) -> String {
    let Ok(doc) = serde_json::from_str::<Value>(raw.trim()) else {
        return raw.to_string();
    };
    if let Value::String(inner) = doc {
        debug!("reply was a JSON string literal");
        return inner;
    }
    for pointer in TEXT_POINTERS {
        if let Some(text) = doc.pointer(pointer).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                debug!(pointer, "unwrapped provider envelope");
                return text.to_string();
            }
        }
    }
    raw.to_string()
}

/// Fold escaping layers while escape markers remain, at most `max_passes`
/// times. Stops at the first layer that does not decode as a string body,
/// which is what keeps already-clean JSON from being damaged.
pub fn unescape_layers(text: &str, max_passes: usize) -> String {
    let mut current = text.to_string();
    let mut passes = 0;
    while passes < max_passes && has_escape_markers(&current) {
        // a layer may still carry its own quotes, or may be a bare body
        let next = serde_json::from_str::<String>(current.trim())
            .or_else(|_| serde_json::from_str::<String>(&format!("\"{current}\"")));
        match next {
            Ok(next) => current = next,
            Err(_) => break,
        }
        passes += 1;
    }
    if passes > 0 {
        debug!(passes, "unescaped reply");
    }
    current
}

fn has_escape_markers(text: &str) -> bool {
    text.contains("\\n") || text.contains("\\\"")
}
