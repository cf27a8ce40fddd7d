//! CLI configuration file support.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// On-disk configuration for the `atlas` binary.
///
/// Command-line flags override values from the file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Cache directory holding the offline store.
    pub cache_directory: Option<PathBuf>,
    /// Root directory for `asset://` resolution.
    pub asset_directory: Option<PathBuf>,
    /// Number of fetch worker threads.
    pub worker_threads: Option<usize>,
}

impl CliConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load a configuration file if one was given, defaults otherwise.
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
