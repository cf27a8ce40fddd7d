//! Fetch engine configuration.

use std::path::{Path, PathBuf};

/// File name of the offline store inside the cache directory.
pub const OFFLINE_DATABASE_FILE: &str = "atlas-offline.db";

/// Default number of fetch worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Configuration for a [`FetchEngine`](crate::FetchEngine).
///
/// The cache directory holds the offline store; it is created if missing and
/// must be writable. The asset directory is the root for `asset://` URL
/// resolution and must already exist.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the cache and offline store.
    pub cache_directory: PathBuf,

    /// Root directory for static asset resolution.
    pub asset_directory: PathBuf,

    /// Number of fetch worker threads.
    ///
    /// Defaults to [`DEFAULT_WORKER_THREADS`]; values below 1 are clamped
    /// to 1.
    pub worker_threads: usize,
}

impl EngineConfig {
    /// Create a configuration for the given cache and asset directories.
    pub fn new(cache_directory: impl Into<PathBuf>, asset_directory: impl Into<PathBuf>) -> Self {
        Self {
            cache_directory: cache_directory.into(),
            asset_directory: asset_directory.into(),
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }

    /// Set the number of fetch worker threads.
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers;
        self
    }

    /// Path of the offline store file inside the cache directory.
    pub fn offline_database_path(&self) -> PathBuf {
        self.cache_directory.join(OFFLINE_DATABASE_FILE)
    }

    /// The asset resolution root.
    pub fn asset_root(&self) -> &Path {
        &self.asset_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::new("/tmp/cache", "/opt/assets");
        assert_eq!(config.cache_directory, PathBuf::from("/tmp/cache"));
        assert_eq!(config.asset_directory, PathBuf::from("/opt/assets"));
        assert_eq!(config.worker_threads, DEFAULT_WORKER_THREADS);
    }

    #[test]
    fn test_offline_database_path() {
        let config = EngineConfig::new("/tmp/cache", "/opt/assets");
        assert_eq!(
            config.offline_database_path(),
            PathBuf::from("/tmp/cache").join(OFFLINE_DATABASE_FILE)
        );
    }

    #[test]
    fn test_worker_thread_override() {
        let config = EngineConfig::new("/tmp/cache", "/opt/assets").with_worker_threads(1);
        assert_eq!(config.worker_threads, 1);
    }
}
