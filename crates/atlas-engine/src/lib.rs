//! Atlas Fetch Engine
//!
//! This crate provides the fetch engine consumed by the Atlas peer layer:
//!
//! - [`FetchEngine`]: a worker-thread pool that resolves resource requests,
//!   applying the installed URL-transform function to each request before
//!   it is fetched
//! - [`EngineConfig`]: cache/asset directory configuration and the offline
//!   store path
//! - [`ResourceLoader`] / [`AssetLoader`]: the resolution seam; `asset://`
//!   URLs are served from the asset root, everything else is supplied by
//!   the embedding host
//!
//! The engine deliberately does not define network transport, cache
//! eviction or the offline store's schema. What it guarantees is the
//! lifecycle the peer layer depends on: construction validates the cache
//! and asset paths, every fetch sees a consistent per-request snapshot of
//! the transform function, and shutdown joins the workers so that no fetch
//! can start afterwards.

pub mod config;
pub mod engine;
pub mod error;
pub mod loader;

// Re-export main types
pub use config::{EngineConfig, DEFAULT_WORKER_THREADS, OFFLINE_DATABASE_FILE};
pub use engine::{FetchEngine, FetchHandle, FetchResult, UrlTransformFn};
pub use error::{EngineError, EngineResult, LoadError, LoadResult};
pub use loader::{AssetLoader, ResourceLoader, ASSET_SCHEME};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{FetchEngine, FetchHandle, FetchResult, UrlTransformFn};
    pub use crate::error::{EngineError, EngineResult, LoadError, LoadResult};
    pub use crate::loader::{AssetLoader, ResourceLoader};
}
