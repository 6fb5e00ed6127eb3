//
//  payload.rs
//  RouteLens
//

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reflector::{Endpoint, HttpVerb};
use crate::refiner::{CodeSummary, RefinedFunction};
use crate::sanitizer::{redact, SanitizedCode};

/// Endpoint block of a payload. `file` is the controller the handler came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEndpoint {
    pub method: HttpVerb,
    pub path: String,
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadFunction {
    pub name: String,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub lines: usize,
    /// Refined code with secrets, e-mails and phone numbers redacted.
    pub cleaned_code: String,
    pub sanitized_code: String,
    pub safety_note: String,
}

/// Everything the reviewer needs about one handler.
///
/// Built once and never mutated. Neither code field carries text that the
/// redaction passes would have replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub endpoint: PayloadEndpoint,
    pub function: PayloadFunction,
    pub metadata: CodeSummary,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisPayload {
    pub fn function_name(&self) -> &str {
        &self.function.name
    }

    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Merge the three stage results for one endpoint.
pub fn build_payload(
    endpoint: &Endpoint,
    refined: &RefinedFunction,
    sanitized: &SanitizedCode,
    controller: Option<&Path>,
) -> AnalysisPayload {
    AnalysisPayload {
        endpoint: PayloadEndpoint {
            method: endpoint.method,
            path: endpoint.path.clone(),
            handler: endpoint.handler.clone(),
            file: controller.map(Path::to_path_buf),
        },
        function: PayloadFunction {
            name: refined.name.clone(),
            is_async: refined.summary.is_async,
            lines: refined.summary.line_count,
            cleaned_code: redact(&refined.cleaned_code),
            sanitized_code: sanitized.safe_code.clone(),
            safety_note: sanitized.note.clone(),
        },
        metadata: refined.summary.clone(),
        timestamp: Utc::now(),
    }
}
