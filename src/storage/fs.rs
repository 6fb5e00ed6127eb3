//! File system operations for RouteLens reports.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::error::{Result, RouteLensError};
use crate::normalizer::NormalizedInsight;
use crate::payload::AnalysisPayload;

/// Writes payloads and insights under two directories.
#[derive(Debug, Clone)]
pub struct ReportStore {
    /// Where analysis payloads go (analysis_reports/)
    payload_dir: PathBuf,
    /// Where normalized insights go (ai_reports/)
    insight_dir: PathBuf,
}

impl ReportStore {
    pub fn new(payload_dir: impl Into<PathBuf>, insight_dir: impl Into<PathBuf>) -> Self {
        Self {
            payload_dir: payload_dir.into(),
            insight_dir: insight_dir.into(),
        }
    }

    pub fn payload_dir(&self) -> &Path {
        &self.payload_dir
    }

    pub fn insight_dir(&self) -> &Path {
        &self.insight_dir
    }

    /// Save as `<function>_<millis>.json`.
    pub fn save_payload(&self, payload: &AnalysisPayload) -> Result<PathBuf> {
        let stem = format!(
            "{}_{}",
            safe_stem(payload.function_name(), "function"),
            Utc::now().timestamp_millis()
        );
        write_json(&self.payload_dir, &stem, payload)
    }

    /// Save as `<handler>_AI_Insights_<timestamp>.json`.
    pub fn save_insight(&self, handler: &str, insight: &NormalizedInsight) -> Result<PathBuf> {
        let timestamp = Utc::now()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let stem = format!("{}_AI_Insights_{}", safe_stem(handler, "endpoint"), timestamp);
        write_json(&self.insight_dir, &stem, insight)
    }

    /// Every `.json` file in the payload directory, sorted by name.
    pub fn list_payloads(&self) -> Result<Vec<PathBuf>> {
        if !self.payload_dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.payload_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Read one payload back.
pub fn load_payload(path: &Path) -> Result<AnalysisPayload> {
    if !path.exists() {
        return Err(RouteLensError::NotFound(path.display().to_string()));
    }
    AnalysisPayload::from_json(&fs::read_to_string(path)?)
}

/// Keep names filesystem-safe: alphanumerics, `_` and `-` only.
fn safe_stem(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Write atomically (temp file, then rename). A name clash within the same
/// millisecond gets a short random suffix.
fn write_json<T: Serialize>(dir: &Path, stem: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let mut file_path = dir.join(format!("{stem}.json"));
    if file_path.exists() {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        file_path = dir.join(format!("{stem}-{}.json", &suffix[..8]));
    }

    let temp_path = file_path.with_extension("json.tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, &file_path)?;

    Ok(file_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::payload::{PayloadEndpoint, PayloadFunction};
    use crate::reflector::HttpVerb;
    use crate::refiner::CodeSummary;
    use tempfile::TempDir;

    fn payload(name: &str) -> AnalysisPayload {
        AnalysisPayload {
            endpoint: PayloadEndpoint {
                method: HttpVerb::Get,
                path: "/users".into(),
                handler: name.into(),
                file: None,
            },
            function: PayloadFunction {
                name: name.into(),
                is_async: false,
                lines: 1,
                cleaned_code: "x".into(),
                sanitized_code: "x".into(),
                safety_note: "safe".into(),
            },
            metadata: CodeSummary {
                name: name.into(),
                is_async: false,
                line_count: 1,
                has_data_access: false,
                has_loops: false,
                has_try_catch: false,
                has_response_handling: false,
            },
            timestamp: Utc::now(),
        }
    }

    fn store() -> (TempDir, ReportStore) {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(temp.path().join("analysis_reports"), temp.path().join("ai_reports"));
        (temp, store)
    }

    #[test]
    fn test_save_and_load_payload() {
        let (_temp, store) = store();
        let path = store.save_payload(&payload("getUsers")).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("getUsers_"));
        assert!(name.ends_with(".json"));
        assert_eq!(load_payload(&path).unwrap().function.name, "getUsers");
    }

    #[test]
    fn test_same_millisecond_does_not_overwrite() {
        let (_temp, store) = store();
        let p = payload("dup");
        let unique: std::collections::HashSet<_> =
            (0..5).map(|_| store.save_payload(&p).unwrap()).collect();
        assert_eq!(unique.len(), 5);
        assert_eq!(store.list_payloads().unwrap().len(), 5);
    }

    #[test]
    fn test_save_insight_name() {
        let (_temp, store) = store();
        let path = store.save_insight("get/users", &normalize("{\"summary\": \"s\"}")).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("get_users_AI_Insights_"));
        assert!(!name.contains(':'));
        assert!(path.starts_with(store.insight_dir()));
    }

    #[test]
    fn test_list_missing_dir_and_load_missing_file() {
        let (_temp, store) = store();
        assert!(store.list_payloads().unwrap().is_empty());
        assert!(matches!(
            load_payload(Path::new("/nope/missing.json")),
            Err(RouteLensError::NotFound(_))
        ));
    }
}
