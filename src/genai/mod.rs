//! Generative-AI reviewer interface.
//!
//! The pipeline only needs [`InsightProvider::analyze`]; transport, auth and
//! retry policy live behind it.

mod client;
mod prompt;

pub use client::GeminiClient;
pub use prompt::{build_analysis_prompt, INSIGHT_KEYS};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GenAiConfig;
use crate::error::Result;
use crate::payload::AnalysisPayload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    pub model: String,
    pub retries: u32,
}

impl From<&GenAiConfig> for AnalyzeOptions {
    fn from(config: &GenAiConfig) -> Self {
        Self {
            model: config.model.clone(),
            retries: config.retries,
        }
    }
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self::from(&GenAiConfig::default())
    }
}

/// Raw reviewer text plus an optimistic parse of it. `parsed` is advisory;
/// the normalizer works from `raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply {
    pub raw: String,
    pub parsed: Option<Value>,
}

impl ProviderReply {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let parsed = optimistic_parse(&raw);
        Self { raw, parsed }
    }
}

/// Something that can review a payload.
pub trait InsightProvider: Send + Sync {
    fn analyze(&self, payload: &AnalysisPayload, options: &AnalyzeOptions) -> Result<ProviderReply>;
}

/// Parse the outermost `{...}` span, if it happens to be valid JSON.
fn optimistic_parse(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}
