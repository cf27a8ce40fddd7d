//! Check command - validate cache and asset paths by initializing a peer.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;

use atlas::prelude::*;

use crate::config::CliConfig;
use crate::OutputFormat;

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Cache directory (overrides the config file)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Asset directory (overrides the config file)
    #[arg(long)]
    pub asset_dir: Option<PathBuf>,
}

/// Check result.
#[derive(Debug, Serialize)]
struct CheckReport {
    ok: bool,
    cache_directory: String,
    asset_directory: String,
    offline_database: Option<String>,
    errors: Vec<String>,
}

/// Execute the check command.
///
/// Performs a real initialize/finalize round trip through the host
/// operations: a passing check means the same paths will work for a real
/// embedding.
pub fn execute(args: CheckArgs, config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let config = CliConfig::load_optional(config_path)?;

    let cache_dir = args
        .cache_dir
        .or(config.cache_directory)
        .ok_or_else(|| anyhow!("No cache directory (use --cache-dir or a config file)"))?;
    let asset_dir = args
        .asset_dir
        .or(config.asset_directory)
        .ok_or_else(|| anyhow!("No asset directory (use --asset-dir or a config file)"))?;

    let mut report = CheckReport {
        ok: true,
        cache_directory: cache_dir.display().to_string(),
        asset_directory: asset_dir.display().to_string(),
        offline_database: None,
        errors: Vec::new(),
    };

    match initialize(&cache_dir, &asset_dir) {
        Ok(id) => {
            if let Some(peer) = atlas::atlas_peer::peer(id) {
                report.offline_database =
                    Some(peer.offline_database_path().display().to_string());
            }
            finalize(id);
        }
        Err(e) => {
            report.ok = false;
            report.errors.push(e.to_string());
        }
    }

    match format {
        OutputFormat::Human => {
            if report.ok {
                println!("Paths are usable");
                println!("  Cache:  {}", report.cache_directory);
                println!("  Assets: {}", report.asset_directory);
                if let Some(db) = &report.offline_database {
                    println!("  Offline store: {}", db);
                }
            } else {
                println!("Paths are NOT usable");
                for error in &report.errors {
                    println!("  Error: {}", error);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    if report.ok {
        Ok(())
    } else {
        Err(anyhow!("Check failed"))
    }
}
