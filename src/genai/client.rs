//! Blocking Gemini client.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{build_analysis_prompt, AnalyzeOptions, InsightProvider, ProviderReply};
use crate::config::GenAiConfig;
use crate::error::{Result, RouteLensError};
use crate::payload::AnalysisPayload;

const TIMEOUT_SECS: u64 = 120;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| RouteLensError::Provider(format!("http client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Read the key from the environment variable named in the config.
    pub fn from_config(config: &GenAiConfig) -> Result<Self> {
        let key = std::env::var(&config.api_key_env).map_err(|_| {
            RouteLensError::Config(format!("{} is not set", config.api_key_env))
        })?;
        if key.trim().is_empty() {
            return Err(RouteLensError::Config(format!("{} is empty", config.api_key_env)));
        }
        Self::new(key, config.api_base.clone())
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };
        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| RouteLensError::Provider(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| RouteLensError::Provider(e.to_string()))?;
        if !status.is_success() {
            return Err(RouteLensError::Provider(format!("HTTP {status}: {text}")));
        }
        Ok(generated_text(&text))
    }
}

impl InsightProvider for GeminiClient {
    fn analyze(&self, payload: &AnalysisPayload, options: &AnalyzeOptions) -> Result<ProviderReply> {
        let prompt = build_analysis_prompt(payload);
        let attempts = options.retries.saturating_add(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!(handler = %payload.endpoint.handler, attempt, model = %options.model, "calling Gemini");
            match self.generate(&options.model, &prompt) {
                Ok(raw) => return Ok(ProviderReply::from_raw(raw)),
                Err(e) => {
                    warn!(handler = %payload.endpoint.handler, attempt, error = %e, "Gemini call failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| RouteLensError::Provider("no attempts made".into())))
    }
}

/// The first candidate's text, or the whole body when it isn't there.
fn generated_text(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/candidates/0/content/parts/0/text")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"summary\":\"x\"}"}]}}]}"#;
        assert_eq!(generated_text(body), r#"{"summary":"x"}"#);
        assert_eq!(generated_text("plain"), "plain");
    }

    #[test]
    fn test_endpoint_url() {
        let client = GeminiClient::new("k", "https://example.test/v1beta/").unwrap();
        assert_eq!(
            client.endpoint("gemini-1.5-flash"),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let config = GenAiConfig {
            api_key_env: "ROUTELENS_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..GenAiConfig::default()
        };
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(RouteLensError::Config(_))
        ));
    }
}
