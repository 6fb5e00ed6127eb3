//! CLI module for RouteLens.
//!
//! Commands:
//! - Scan: endpoints
//! - Package: analyze
//! - Review: review, normalize

pub mod analyze;
pub mod format;
pub mod review;

pub use format::{format_analysis, format_insight, format_scan};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{RouteLensConfig, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "routelens")]
#[command(about = "RouteLens - AI review for Express handlers", long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Config file (default: <root>/routelens.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the endpoints declared in a routes file
    Endpoints {
        /// Routes file (e.g. src/routes/user.routes.js)
        routes_file: PathBuf,
    },

    /// Build and save a sanitized payload for each endpoint
    Analyze {
        /// Routes file
        routes_file: PathBuf,

        /// Only these handlers (repeatable)
        #[arg(short, long)]
        only: Vec<String>,
    },

    /// Send saved payloads to the reviewer and save the normalized insights
    Review {
        /// Payload files (default: every payload in the payload directory)
        payloads: Vec<PathBuf>,
    },

    /// Normalize a raw reviewer reply from a file (or - for stdin)
    Normalize {
        /// Reply file
        reply_file: PathBuf,
    },
}

impl Cli {
    /// Explicit `--config` must load; the default location may be absent.
    pub fn load_config(&self) -> anyhow::Result<RouteLensConfig> {
        match &self.config {
            Some(path) => Ok(RouteLensConfig::load_strict(path)?),
            None => Ok(RouteLensConfig::load(&self.root.join(CONFIG_FILE))),
        }
    }
}

/// Dispatch a parsed command.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    let root: &Path = &cli.root;

    match cli.command {
        Commands::Endpoints { routes_file } => analyze::endpoints(&config, root, &routes_file),
        Commands::Analyze { routes_file, only } => {
            analyze::analyze(config, root, &routes_file, &only)
        }
        Commands::Review { payloads } => review::review(&config, root, &payloads),
        Commands::Normalize { reply_file } => review::normalize(&config, root, &reply_file),
    }
}
