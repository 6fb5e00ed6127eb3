//! Storage layer for RouteLens.
//!
//! Handles all file system operations:
//! - Writing analysis payloads (`analysis_reports/`)
//! - Writing normalized insights (`ai_reports/`)
//! - Reading payloads back for review

mod fs;

pub use fs::{load_payload, ReportStore};
