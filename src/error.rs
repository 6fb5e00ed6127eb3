//! Error types for RouteLens.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for RouteLens operations.
pub type Result<T> = std::result::Result<T, RouteLensError>;

/// Errors that can occur in RouteLens.
///
/// Only the fallible edges of the system produce these. The core components
/// (reflector, refiner, sanitizer, payload builder, normalizer) are total and
/// report failure through the shape of their return value instead.
#[derive(Error, Debug)]
pub enum RouteLensError {
    /// A file, endpoint or handler could not be found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The source file could not be structurally parsed at all.
    #[error("Unparsable source {path:?}: {reason}")]
    UnparsableSource { path: PathBuf, reason: String },

    /// An AI reply could not be recovered into structured form.
    #[error("Unparsable reply: {0}")]
    UnparsableReply(String),

    /// File extension is not a JS-family language we can parse.
    #[error("Unsupported language: {0:?}")]
    UnsupportedLanguage(PathBuf),

    /// tree-sitter refused the grammar.
    #[error("Failed to initialize parser for {0:?}: {1}")]
    ParserInit(PathBuf, String),

    /// Configuration file is present but invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The generative-AI provider failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RouteLensError {
    /// True for conditions a batch loop should log and skip past.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            RouteLensError::NotFound(_)
                | RouteLensError::UnparsableSource { .. }
                | RouteLensError::UnparsableReply(_)
                | RouteLensError::UnsupportedLanguage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skippable_taxonomy() {
        assert!(RouteLensError::NotFound("getUsers".into()).is_skippable());
        assert!(RouteLensError::UnparsableSource {
            path: PathBuf::from("a.js"),
            reason: "syntax".into(),
        }
        .is_skippable());
        assert!(RouteLensError::UnparsableReply("unparseable".into()).is_skippable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(!RouteLensError::from(io).is_skippable());
    }
}
