//
//  mod.rs
//  RouteLens
//
//  Response normalizer. Turns whatever the reviewer model sent back into a
//  `NormalizedInsight`. Preprocessing stages run in a fixed order and each
//  may pass its input through untouched; parsing is a chain of strategies
//  tried until one yields an object. Nothing in here panics or returns Err.
//

mod envelope;
mod insight;
mod repair;
mod strategy;

pub use envelope::{unescape_layers, unwrap_envelope};
pub use insight::{
    present_code, project, Finding, Insight, InsightFailure, NormalizedInsight, DEFAULT_NOTES,
    DEFAULT_SUMMARY,
};
pub use repair::{auto_close, cleanup, extract_candidate, lenient_rewrite};
pub use strategy::{default_chain, LenientParse, Recovery, RecoveryStrategy, StrictParse};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::NormalizerConfig;
use crate::diagnostics::{DiagnosticRecord, DiagnosticSink, NullDiagnosticSink};

pub const ERROR_EMPTY: &str = "empty reply";
pub const ERROR_UNPARSEABLE: &str = "unparseable";

pub struct Normalizer {
    max_unescape_passes: usize,
    strategies: Vec<Box<dyn RecoveryStrategy>>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default(), Arc::new(NullDiagnosticSink))
    }
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            max_unescape_passes: config.max_unescape_passes,
            strategies: default_chain(),
            sink,
        }
    }

    /// Append a strategy after the existing ones.
    pub fn with_strategy(mut self, strategy: Box<dyn RecoveryStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn normalize(&self, raw: &str) -> NormalizedInsight {
        if raw.trim().is_empty() {
            warn!("empty reply from provider");
            self.dump(raw, "");
            return NormalizedInsight::failure(ERROR_EMPTY, None);
        }

        let repaired = self.prepare(raw);

        for strategy in &self.strategies {
            match strategy.attempt(&repaired) {
                Recovery::Parsed(map) => {
                    debug!(strategy = strategy.name(), "reply recovered");
                    return NormalizedInsight::Insight(project(map));
                }
                Recovery::Next(reason) => {
                    warn!(strategy = strategy.name(), %reason, "could not parse reply");
                }
            }
        }

        warn!("reply unparseable after every strategy");
        self.dump(raw, &repaired);
        NormalizedInsight::failure(ERROR_UNPARSEABLE, Some(repaired))
    }

    fn dump(&self, raw: &str, extracted: &str) {
        let record = DiagnosticRecord {
            raw: raw.to_string(),
            extracted: extracted.to_string(),
        };
        if let Err(e) = self.sink.record(&record) {
            warn!(error = %e, "diagnostic dump failed");
        }
    }

    /// Envelope, escaping, extraction, cleanup, auto-close.
    fn prepare(&self, raw: &str) -> String {
        let text = unwrap_envelope(raw);
        let text = unescape_layers(&text, self.max_unescape_passes);
        let candidate = extract_candidate(&text);
        let cleaned = cleanup(&candidate);
        auto_close(&cleaned)
    }
}

/// Normalize with default settings and no diagnostic dump.
pub fn normalize(raw: &str) -> NormalizedInsight {
    Normalizer::default().normalize(raw)
}
