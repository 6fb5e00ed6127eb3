//
//  config.rs
//  RouteLens
//

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RouteLensError};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "routelens.toml";

/// Top-level RouteLens configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteLensConfig {
    #[serde(default)]
    pub reflector: ReflectorConfig,
    #[serde(default)]
    pub refiner: RefinerConfig,
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub genai: GenAiConfig,
}

/// Endpoint reflector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectorConfig {
    /// Router identifier assumed when no `Router()` construction is found.
    #[serde(default = "default_router")]
    pub default_router: String,
}

/// Logic refiner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinerConfig {
    /// Receivers whose `<receiver>.<method>(...)` statements count as debug output.
    #[serde(default = "default_log_receivers")]
    pub log_receivers: Vec<String>,
}

/// Sanitizer thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// String/object literals longer than this are replaced.
    #[serde(default = "default_literal_threshold")]
    pub literal_threshold: usize,
    /// Hard cap on the sanitized code, marker included.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

/// Reply normalizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Upper bound on escape layers folded from a reply.
    #[serde(default = "default_max_unescape_passes")]
    pub max_unescape_passes: usize,
    /// Where unparseable replies are dumped.
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: String,
}

/// Output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_payload_dir")]
    pub payload_dir: String,
    #[serde(default = "default_insight_dir")]
    pub insight_dir: String,
}

/// Generative AI provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenAiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_router() -> String {
    "router".to_string()
}

fn default_log_receivers() -> Vec<String> {
    vec!["console".to_string(), "logger".to_string()]
}

fn default_literal_threshold() -> usize {
    150
}

fn default_max_length() -> usize {
    1500
}

fn default_max_unescape_passes() -> usize {
    3
}

fn default_diagnostics_dir() -> String {
    "logs".to_string()
}

fn default_payload_dir() -> String {
    "analysis_reports".to_string()
}

fn default_insight_dir() -> String {
    "ai_reports".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_retries() -> u32 {
    3
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            default_router: default_router(),
        }
    }
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            log_receivers: default_log_receivers(),
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            literal_threshold: default_literal_threshold(),
            max_length: default_max_length(),
        }
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_unescape_passes: default_max_unescape_passes(),
            diagnostics_dir: default_diagnostics_dir(),
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            payload_dir: default_payload_dir(),
            insight_dir: default_insight_dir(),
        }
    }
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            retries: default_retries(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl RouteLensConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Strict variant of [`load`](Self::load) for an explicitly requested file.
    pub fn load_strict(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| RouteLensError::Config(e.to_string()))
    }

    /// Resolve the payload directory against the project root.
    pub fn payload_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.reports.payload_dir)
    }

    /// Resolve the insight directory against the project root.
    pub fn insight_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.reports.insight_dir)
    }

    /// Resolve the diagnostics directory against the project root.
    pub fn diagnostics_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.normalizer.diagnostics_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = RouteLensConfig::load(Path::new("/definitely/not/here.toml"));
        assert_eq!(cfg.reflector.default_router, "router");
        assert_eq!(cfg.sanitizer.literal_threshold, 150);
        assert_eq!(cfg.sanitizer.max_length, 1500);
        assert_eq!(cfg.normalizer.max_unescape_passes, 3);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[sanitizer]\nmax_length = 800\n").unwrap();

        let cfg = RouteLensConfig::load(&path);
        assert_eq!(cfg.sanitizer.max_length, 800);
        assert_eq!(cfg.sanitizer.literal_threshold, 150);
        assert_eq!(cfg.refiner.log_receivers, vec!["console", "logger"]);
    }

    #[test]
    fn test_broken_file_falls_back_but_strict_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[sanitizer\nmax_length = ").unwrap();

        assert_eq!(RouteLensConfig::load(&path).sanitizer.max_length, 1500);
        assert!(matches!(
            RouteLensConfig::load_strict(&path),
            Err(RouteLensError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_dirs() {
        let cfg = RouteLensConfig::default();
        let root = Path::new("/project");
        assert_eq!(cfg.payload_dir(root), PathBuf::from("/project/analysis_reports"));
        assert_eq!(cfg.insight_dir(root), PathBuf::from("/project/ai_reports"));
        assert_eq!(cfg.diagnostics_dir(root), PathBuf::from("/project/logs"));
    }
}
