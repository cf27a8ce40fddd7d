//! Fetch command - fetch one resource through an engine peer.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use atlas::prelude::*;

use crate::config::CliConfig;
use crate::OutputFormat;

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// URL of the resource to fetch
    #[arg(required = true)]
    pub url: String,

    /// Kind of the resource
    #[arg(short, long, default_value = "other", value_parser = parse_kind)]
    pub kind: ResourceKind,

    /// Cache directory (overrides the config file)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Asset directory (overrides the config file)
    #[arg(long)]
    pub asset_dir: Option<PathBuf>,

    /// URL rewrite rule FROM=TO; repeat for multiple rules
    #[arg(long = "rewrite", value_name = "FROM=TO")]
    pub rewrites: Vec<String>,

    /// Number of fetch worker threads
    #[arg(long)]
    pub workers: Option<usize>,
}

fn parse_kind(value: &str) -> std::result::Result<ResourceKind, String> {
    match value {
        "other" => Ok(ResourceKind::Other),
        "style" => Ok(ResourceKind::Style),
        "source" => Ok(ResourceKind::Source),
        "tile" => Ok(ResourceKind::Tile),
        "glyph" => Ok(ResourceKind::Glyph),
        "sprite" => Ok(ResourceKind::Sprite),
        "image" => Ok(ResourceKind::Image),
        other => Err(format!("unknown resource kind '{}'", other)),
    }
}

/// One `FROM=TO` prefix rewrite.
#[derive(Debug, Clone)]
struct RewriteRule {
    from: String,
    to: String,
}

impl RewriteRule {
    fn parse(spec: &str) -> Result<Self> {
        let (from, to) = spec
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid rewrite rule '{}', expected FROM=TO", spec))?;
        if from.is_empty() {
            return Err(anyhow!("Invalid rewrite rule '{}', FROM must not be empty", spec));
        }
        Ok(Self {
            from: from.to_owned(),
            to: to.to_owned(),
        })
    }
}

/// Prefix-rewriting transform; the longest matching FROM prefix wins.
///
/// This is host-side rewrite logic: the engine only ever sees the opaque
/// transform handle.
struct PrefixRewrite {
    rules: Vec<RewriteRule>,
}

impl ResourceTransform for PrefixRewrite {
    fn on_url(&self, _kind: ResourceKind, url: &str) -> String {
        self.rules
            .iter()
            .filter(|rule| url.starts_with(&rule.from))
            .max_by_key(|rule| rule.from.len())
            .map(|rule| format!("{}{}", rule.to, &url[rule.from.len()..]))
            .unwrap_or_else(|| url.to_owned())
    }
}

/// Fetch outcome report.
#[derive(Debug, Serialize)]
struct FetchReport {
    kind: ResourceKind,
    url: String,
    effective_url: String,
    rewritten: bool,
    bytes: Option<usize>,
    error: Option<String>,
}

/// Execute the fetch command.
pub fn execute(
    args: FetchArgs,
    config_path: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let config = CliConfig::load_optional(config_path)?;

    let cache_dir = args
        .cache_dir
        .or(config.cache_directory)
        .ok_or_else(|| anyhow!("No cache directory (use --cache-dir or a config file)"))?;
    let asset_dir = args
        .asset_dir
        .or(config.asset_directory)
        .ok_or_else(|| anyhow!("No asset directory (use --asset-dir or a config file)"))?;

    let rules = args
        .rewrites
        .iter()
        .map(|spec| RewriteRule::parse(spec))
        .collect::<Result<Vec<_>>>()?;

    let mut builder = Atlas::builder()
        .with_cache_directory(cache_dir)
        .with_asset_directory(asset_dir);
    if let Some(workers) = args.workers.or(config.worker_threads) {
        builder = builder.with_worker_threads(workers);
    }

    let peer = builder.build().context("Failed to initialize engine peer")?;
    debug!(peer_id = %peer.id(), "Initialized engine peer");

    if !rules.is_empty() {
        peer.set_transform(Some(Arc::new(PrefixRewrite { rules })));
    }

    let result = peer
        .fetch(ResourceRequest::new(args.kind, args.url.clone()))
        .context("Failed to issue fetch")?
        .wait()
        .ok_or_else(|| anyhow!("Engine shut down before the fetch completed"))?;

    peer.destroy();

    let report = FetchReport {
        kind: args.kind,
        url: args.url,
        rewritten: result.effective_url != result.request.url(),
        effective_url: result.effective_url,
        bytes: result.body.as_ref().ok().map(|body| body.len()),
        error: result.body.as_ref().err().map(|e| e.to_string()),
    };

    match format {
        OutputFormat::Human => {
            if !quiet {
                println!("Requested: {} {}", report.kind, report.url);
                if report.rewritten {
                    println!("Rewritten: {}", report.effective_url);
                }
                match (&report.bytes, &report.error) {
                    (Some(bytes), _) => println!("Fetched {} bytes", bytes),
                    (None, Some(error)) => println!("Fetch failed: {}", error),
                    (None, None) => {}
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

    if report.error.is_some() {
        Err(anyhow!("Fetch failed"))
    } else {
        Ok(())
    }
}
