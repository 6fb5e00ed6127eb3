//! Review operations: review, normalize

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use super::analyze::in_root;
use super::format::format_insight;
use crate::config::RouteLensConfig;
use crate::diagnostics::FileDiagnosticSink;
use crate::genai::{AnalyzeOptions, GeminiClient, InsightProvider};
use crate::normalizer::Normalizer;
use crate::pipeline::review_payload;
use crate::storage::{load_payload, ReportStore};

fn normalizer_for(config: &RouteLensConfig, root: &Path) -> Normalizer {
    let sink = FileDiagnosticSink::new(config.diagnostics_dir(root));
    Normalizer::new(&config.normalizer, Arc::new(sink))
}

/// Review payloads with the configured Gemini model.
pub fn review(config: &RouteLensConfig, root: &Path, payloads: &[PathBuf]) -> Result<()> {
    let client = GeminiClient::from_config(&config.genai)?;
    review_with(&client, config, root, payloads)
}

/// Review with any provider. An empty `payloads` list means every saved payload.
pub fn review_with(
    provider: &dyn InsightProvider,
    config: &RouteLensConfig,
    root: &Path,
    payloads: &[PathBuf],
) -> Result<()> {
    let store = ReportStore::new(config.payload_dir(root), config.insight_dir(root));
    let paths: Vec<PathBuf> = if payloads.is_empty() {
        store.list_payloads()?
    } else {
        payloads.iter().map(|p| in_root(root, p)).collect()
    };

    if paths.is_empty() {
        println!("No payloads in {}", store.payload_dir().display());
        return Ok(());
    }

    let normalizer = normalizer_for(config, root);
    let options = AnalyzeOptions::from(&config.genai);
    let mut failed = 0;

    for path in &paths {
        let payload = load_payload(path).with_context(|| format!("loading {}", path.display()))?;
        let handler = payload.endpoint.handler.clone();

        let insight = match review_payload(provider, &normalizer, &payload, &options) {
            Ok(insight) => insight,
            Err(e) => {
                println!("✗ {handler}: {e}");
                failed += 1;
                continue;
            }
        };

        let saved = store.save_insight(&handler, &insight)?;
        println!("{} ({})", payload.endpoint.handler, saved.display());
        print!("{}", format_insight(&insight));
        if let Err(e) = insight.into_result() {
            warn!(handler = %handler, error = %e, "review not recovered");
            failed += 1;
        }
    }

    if failed > 0 {
        println!("{failed} of {} review(s) failed", paths.len());
    }
    Ok(())
}

/// Normalize a saved reply; `-` reads stdin.
pub fn normalize(config: &RouteLensConfig, root: &Path, reply_file: &Path) -> Result<()> {
    let raw = if reply_file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(reply_file)
            .with_context(|| format!("reading {}", reply_file.display()))?
    };

    let insight = normalizer_for(config, root).normalize(&raw);
    print!("{}", format_insight(&insight));
    Ok(())
}
