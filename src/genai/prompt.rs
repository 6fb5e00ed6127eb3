//! Review prompt construction.

use crate::payload::AnalysisPayload;

/// Keys the reviewer is asked to return.
pub const INSIGHT_KEYS: [&str; 5] = ["summary", "issues", "suggestions", "before_after", "notes"];

/// Build the review prompt for one payload. Only the sanitized code is
/// embedded; the cleaned code is a fallback for payloads built elsewhere.
pub fn build_analysis_prompt(payload: &AnalysisPayload) -> String {
    let endpoint = &payload.endpoint;
    let function = &payload.function;
    let metadata = serde_json::to_string(&payload.metadata).unwrap_or_else(|_| "{}".to_string());

    let code = [function.sanitized_code.as_str(), function.cleaned_code.as_str()]
        .into_iter()
        .find(|c| !c.trim().is_empty())
        .unwrap_or("// no code provided");

    let name = if function.name.is_empty() {
        "anonymous"
    } else {
        function.name.as_str()
    };

    [
        "You are an expert Node.js/Express backend engineer focused on performance and scalability.".to_string(),
        "Analyze the following Express API endpoint and provide:".to_string(),
        "  1) Short summary (1-2 lines)".to_string(),
        "  2) Performance issues (bulleted)".to_string(),
        "  3) Actionable optimizations (code-level)".to_string(),
        "  4) Difficulty & impact ratings".to_string(),
        "  5) Before -> After pseudo-code (if applicable)".to_string(),
        String::new(),
        "Constraints:".to_string(),
        " - Output ONLY valid JSON (no extra commentary).".to_string(),
        format!(" - Use keys: {}.", INSIGHT_KEYS.join(", ")),
        String::new(),
        format!(
            "Endpoint: [{}] {} ({})",
            endpoint.method.as_str().to_uppercase(),
            endpoint.path,
            endpoint.handler
        ),
        format!("Function: {} | Async: {}", name, function.is_async),
        format!("Metadata: {metadata}"),
        String::new(),
        "CODE:".to_string(),
        "```js".to_string(),
        code.to_string(),
        "```".to_string(),
    ]
    .join("\n")
}
