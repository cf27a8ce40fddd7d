//! Error types for the fetch engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors during engine construction and lifecycle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The cache directory could not be created or is not writable.
    #[error("Cache directory not usable: {path}: {source}")]
    CacheDirectory {
        /// The offending path.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The asset directory does not exist or is not a directory.
    #[error("Asset directory not usable: {path}")]
    AssetDirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// A fetch worker thread could not be spawned.
    #[error("Failed to spawn fetch worker: {0}")]
    ThreadSpawn(String),

    /// The engine has been shut down; no new fetches may start.
    #[error("Engine is shut down")]
    ShutDown,
}

/// Errors while loading a single resource.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The resource does not exist.
    #[error("Resource not found: {url}")]
    NotFound {
        /// The URL that was requested.
        url: String,
    },

    /// An asset URL resolved outside the asset root.
    #[error("Asset path escapes the asset root: {url}")]
    OutsideAssetRoot {
        /// The URL that was requested.
        url: String,
    },

    /// No loader handles the URL's scheme.
    #[error("Unsupported URL scheme: {url}")]
    UnsupportedScheme {
        /// The URL that was requested.
        url: String,
    },

    /// IO error while reading the resource.
    #[error("IO error reading {url}: {source}")]
    Io {
        /// The URL that was requested.
        url: String,
        /// The underlying IO error.
        source: std::io::Error,
    },
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type alias for load operations.
pub type LoadResult<T> = std::result::Result<T, LoadError>;
