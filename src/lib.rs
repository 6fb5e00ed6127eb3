//! # RouteLens
//!
//! Pulls Express request handlers out of a Node.js project, strips and
//! redacts them, and turns whatever a generative reviewer sends back into a
//! fixed, predictable shape.
//!
//! ## Pipeline
//!
//! ```text
//! routes file ──▶ reflector ──▶ locator ──▶ refiner ──▶ sanitizer ──▶ payload
//!                                                                      │
//!                      insight ◀── normalizer ◀── reviewer (genai) ◀───┘
//! ```
//!
//! Every stage is also usable on its own with plain source text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routelens::{Pipeline, RouteLensConfig};
//! use std::path::Path;
//!
//! let pipeline = Pipeline::new(RouteLensConfig::default(), ".");
//! let analysis = pipeline
//!     .analyze_routes(Path::new("src/routes/user.routes.js"), &[])
//!     .unwrap();
//!
//! for payload in analysis.payloads() {
//!     println!("{}", payload.to_json_pretty().unwrap());
//! }
//! ```

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod genai;
pub mod locator;
pub mod normalizer;
pub mod parser;
pub mod payload;
pub mod pipeline;
pub mod refiner;
pub mod reflector;
pub mod sanitizer;
pub mod storage;

// Re-exports for convenience
pub use config::RouteLensConfig;
pub use diagnostics::{DiagnosticSink, FileDiagnosticSink, NullDiagnosticSink};
pub use error::{Result, RouteLensError};
pub use genai::{GeminiClient, InsightProvider};
pub use locator::{locate, ExtractedFunction};
pub use normalizer::{normalize, NormalizedInsight, Normalizer};
pub use payload::{build_payload, AnalysisPayload};
pub use pipeline::{review_payload, Pipeline, RouteAnalysis};
pub use refiner::{refine, RefinedFunction, Refiner};
pub use reflector::{scan_endpoints, Endpoint, HttpVerb};
pub use sanitizer::{sanitize, SanitizedCode, Sanitizer};
pub use storage::ReportStore;

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = r#"
const express = require("express");
const userRouter = express.Router();

userRouter.get("/users", listUsers);
userRouter.route("/users/:id").put(updateUser);
"#;

    const CONTROLLER: &str = r#"
// update handler
exports.updateUser = async function (req, res) {
  logger.info("updating", req.params.id);
  const apiKey = "sk-live-0123456789";
  const user = await User.findByIdAndUpdate(req.params.id, req.body);
  res.json(user);
};
"#;

    #[test]
    fn test_text_stages_end_to_end() {
        let endpoints = scan_endpoints(ROUTES);
        assert_eq!(endpoints.len(), 2);
        let update = &endpoints[1];
        assert_eq!(update.method, HttpVerb::Put);
        assert_eq!(update.path, "/users/:id");

        let extracted = locate(CONTROLLER, &update.handler).unwrap();
        let refined = refine(extracted.as_ref()).unwrap();
        assert!(!refined.cleaned_code.contains("logger.info"));
        assert!(!refined.cleaned_code.contains("// update handler"));
        assert!(refined.summary.is_async);
        assert!(refined.summary.has_data_access);

        let sanitized = sanitize(&refined.cleaned_code);
        assert!(!sanitized.safe_code.contains("sk-live"));

        let payload = build_payload(update, &refined, &sanitized, None);
        assert_eq!(payload.endpoint.handler, "updateUser");
        assert!(!payload.function.cleaned_code.contains("sk-live"));

        let reply = format!(
            "Here you go:\n```json\n{{\"summary\": \"Updates {}\", \"issues\": [\"no validation\"],}}\n```",
            payload.function_name()
        );
        let insight = normalize(&reply);
        let insight = insight.as_insight().unwrap();
        assert_eq!(insight.summary, "Updates updateUser");
        assert_eq!(insight.issues.len(), 1);
        assert_eq!(insight.notes, normalizer::DEFAULT_NOTES);
    }
}
