//! Plain-text rendering for terminal output.

use std::fmt::Write;

use crate::normalizer::{Finding, NormalizedInsight};
use crate::pipeline::RouteAnalysis;
use crate::reflector::{ScanOutcome, ScanReport};

const RULE: &str = "──────────────────────────────";

/// Render a review result. Failures print the error only.
pub fn format_insight(insight: &NormalizedInsight) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "AI Analysis Result");
    let _ = writeln!(out, "{RULE}");

    let insight = match insight {
        NormalizedInsight::Failure(failure) => {
            let _ = writeln!(out, "Error: {}", failure.error);
            let _ = writeln!(out, "{RULE}");
            return out;
        }
        NormalizedInsight::Insight(insight) => insight,
    };

    let _ = writeln!(out, "Summary: {}", insight.summary);
    write_findings(&mut out, "Issues", &insight.issues);
    write_findings(&mut out, "Suggestions", &insight.suggestions);

    if let Some(before_after) = &insight.before_after {
        let _ = writeln!(out, "\nBefore/After:\n");
        let _ = writeln!(out, "{before_after}");
    }

    let _ = writeln!(out, "\nNotes: {}", insight.notes);
    let _ = writeln!(out, "{RULE}");
    out
}

fn write_findings(out: &mut String, title: &str, findings: &[Finding]) {
    let _ = writeln!(out, "\n{title}:");
    if findings.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (idx, finding) in findings.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", idx + 1, finding.description());
    }
}

/// One line per endpoint, plus what the scan had to assume or skip.
pub fn format_scan(report: &ScanReport) -> String {
    let mut out = String::new();
    for registration in &report.registrations {
        let _ = writeln!(out, "{:>4}  {}", registration.line, registration.endpoint.label());
    }
    match report.outcome() {
        ScanOutcome::Matched(endpoints) => {
            let _ = writeln!(out, "{} endpoint(s)", endpoints.len());
        }
        ScanOutcome::Ambiguous { endpoints, reasons } => {
            let _ = writeln!(out, "{} endpoint(s), with caveats:", endpoints.len());
            for reason in reasons {
                let _ = writeln!(out, "  - {reason}");
            }
        }
        ScanOutcome::NotFound => {
            let _ = writeln!(out, "No endpoints found.");
        }
    }
    out
}

/// Outcome list for an `analyze` run.
pub fn format_analysis(analysis: &RouteAnalysis, saved: &[(String, std::path::PathBuf)]) -> String {
    let mut out = String::new();
    for (handler, path) in saved {
        let _ = writeln!(out, "✓ {handler} → {}", path.display());
    }
    for (endpoint, error) in analysis.failures() {
        let _ = writeln!(out, "✗ {}: {error}", endpoint.label());
    }
    let _ = writeln!(
        out,
        "{} of {} endpoint(s) packaged",
        saved.len(),
        analysis.outcomes.len()
    );
    out
}
