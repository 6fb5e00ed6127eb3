//! Offline dumps of replies the normalizer could not recover.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Fixed name of the dump file. Each failure overwrites the previous one.
pub const DUMP_FILE: &str = "debug_last_response.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub raw: String,
    pub extracted: String,
}

/// Receives unparseable replies. Callers ignore the result beyond logging it.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, record: &DiagnosticRecord) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnosticSink;

impl DiagnosticSink for NullDiagnosticSink {
    fn record(&self, _record: &DiagnosticRecord) -> Result<()> {
        Ok(())
    }
}

/// Writes the last failure to `<dir>/debug_last_response.json`.
#[derive(Debug, Clone)]
pub struct FileDiagnosticSink {
    dir: PathBuf,
}

impl FileDiagnosticSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dump_path(&self) -> PathBuf {
        self.dir.join(DUMP_FILE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn record(&self, record: &DiagnosticRecord) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dump_path();
        let temp_path = path.with_extension("json.tmp");

        let mut file = File::create(&temp_path)?;
        file.write_all(serde_json::to_string_pretty(record)?.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        tracing::info!(path = %path.display(), "unparseable reply dumped");
        Ok(())
    }
}
