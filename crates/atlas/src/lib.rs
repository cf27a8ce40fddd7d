//! # Atlas - Host-Driven Resource Loader
//!
//! Atlas lets a host application drive and customize a resource-loading
//! engine: map tiles, styles, sprites, glyphs and other assets, fetched by
//! a worker pool with a local cache and offline store. The host constructs
//! an engine peer tied to one of its own objects, optionally installs a
//! callback that rewrites each resource URL before it is fetched, and
//! finalizes the peer when the host object goes away.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use atlas::prelude::*;
//!
//! // One peer per host object.
//! let peer = Atlas::builder()
//!     .with_cache_directory("/tmp/cache")
//!     .with_asset_directory("/opt/assets")
//!     .build()?;
//!
//! // Reroute tile traffic; the rewrite logic lives in host code.
//! peer.set_transform(Some(Arc::new(|_: ResourceKind, url: &str| {
//!     url.replace("http://tiles.example.com/", "http://mirror.example.com/")
//! })));
//!
//! let result = peer
//!     .fetch(ResourceRequest::new(ResourceKind::Tile, "http://tiles.example.com/0/0/0.pbf"))?
//!     .wait();
//!
//! // Finalization is explicit and single-shot.
//! peer.destroy();
//! ```
//!
//! ## Safety Model
//!
//! The transform sits on a concurrency-sensitive boundary: fetch workers
//! invoke it while the host replaces it or tears the whole engine down.
//! Atlas guarantees:
//!
//! 1. A handle is never invoked after its last holder released it.
//! 2. Replacing a handle releases the previous one exactly once, and only
//!    after every in-flight invocation against it has returned.
//! 3. Destroying a peer releases the engine and any registered handle
//!    exactly once, and no fetch can start afterwards.
//! 4. A panicking host callback degrades that one request to its original
//!    URL; it never crashes the engine or affects unrelated fetches.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     Host Application                    │
//! ├─────────────────────────────────────────────────────────┤
//! │                      atlas (facade)                     │
//! │                    ┌─────────────────┐                  │
//! │                    │  Atlas Builder  │                  │
//! │                    └────────┬────────┘                  │
//! │                             │                           │
//! │  ┌──────────────┬──────────┴───────┬───────────────┐   │
//! │  │ atlas-peer   │   atlas-bridge   │ atlas-engine  │   │
//! │  │ (lifecycle,  │ (slot, invoker,  │ (workers,     │   │
//! │  │  registry)   │  transforms)     │  cache paths) │   │
//! │  └──────────────┴──────────────────┴───────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use atlas_engine::{EngineConfig, ResourceLoader};
use atlas_peer::{EnginePeer, PeerError};

// Re-export from sub-crates
pub use atlas_bridge;
pub use atlas_engine;
pub use atlas_peer;

/// Main entry point for Atlas.
pub struct Atlas;

impl Atlas {
    /// Create a new peer builder.
    pub fn builder() -> AtlasBuilder {
        AtlasBuilder::new()
    }
}

/// Builder for configuring an engine peer.
pub struct AtlasBuilder {
    cache_directory: Option<PathBuf>,
    asset_directory: Option<PathBuf>,
    worker_threads: Option<usize>,
    loader: Option<Arc<dyn ResourceLoader>>,
}

impl AtlasBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            cache_directory: None,
            asset_directory: None,
            worker_threads: None,
            loader: None,
        }
    }

    /// Set the cache directory (holds the offline store).
    pub fn with_cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory = Some(path.into());
        self
    }

    /// Set the static asset root directory.
    pub fn with_asset_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.asset_directory = Some(path.into());
        self
    }

    /// Set the number of fetch worker threads.
    pub fn with_worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = Some(workers);
        self
    }

    /// Set a custom resource loader.
    ///
    /// Defaults to the `asset://` loader rooted at the asset directory.
    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Build the peer.
    pub fn build(self) -> Result<EnginePeer, AtlasError> {
        let cache_directory = self
            .cache_directory
            .ok_or(AtlasError::MissingCacheDirectory)?;
        let asset_directory = self
            .asset_directory
            .ok_or(AtlasError::MissingAssetDirectory)?;

        let mut config = EngineConfig::new(cache_directory, asset_directory);
        if let Some(workers) = self.worker_threads {
            config = config.with_worker_threads(workers);
        }

        let peer = match self.loader {
            Some(loader) => EnginePeer::create_with_loader(config, loader),
            None => EnginePeer::create(config),
        }?;

        Ok(peer)
    }
}

impl Default for AtlasBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from the Atlas facade.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// No cache directory was configured.
    #[error("No cache directory configured")]
    MissingCacheDirectory,

    /// No asset directory was configured.
    #[error("No asset directory configured")]
    MissingAssetDirectory,

    /// Peer construction failed.
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{Atlas, AtlasBuilder, AtlasError};

    // Bridge types
    pub use atlas_bridge::{
        ResourceKind, ResourceRequest, ResourceTransform, TransformHandle, TransformInvoker,
        TransformSlot,
    };

    // Engine types
    pub use atlas_engine::{
        AssetLoader, EngineConfig, EngineError, FetchEngine, FetchHandle, FetchResult, LoadError,
        ResourceLoader,
    };

    // Peer types
    pub use atlas_peer::{
        finalize, initialize, initialize_with, set_resource_transform, EnginePeer, PeerError,
        PeerId,
    };

    // Common std types
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex};
    use std::thread;
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use atlas_bridge::{ResourceKind, ResourceRequest, ResourceTransform, TransformHandle};
    use atlas_engine::{EngineConfig, LoadError};
    use atlas_peer::{finalize, initialize_with, set_resource_transform, PeerError};

    struct RecordingLoader {
        urls: Mutex<Vec<String>>,
    }

    impl RecordingLoader {
        fn new() -> Self {
            Self {
                urls: Mutex::new(Vec::new()),
            }
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    impl ResourceLoader for RecordingLoader {
        fn load(&self, _kind: ResourceKind, url: &str) -> Result<Bytes, LoadError> {
            self.urls.lock().unwrap().push(url.to_owned());
            Ok(Bytes::from_static(b"payload"))
        }
    }

    struct Fixture {
        peer: EnginePeer,
        loader: Arc<RecordingLoader>,
        _cache: tempfile::TempDir,
        _assets: tempfile::TempDir,
    }

    fn fixture(workers: usize) -> Fixture {
        let cache = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let loader = Arc::new(RecordingLoader::new());

        let peer = Atlas::builder()
            .with_cache_directory(cache.path())
            .with_asset_directory(assets.path())
            .with_worker_threads(workers)
            .with_loader(Arc::clone(&loader) as _)
            .build()
            .unwrap();

        Fixture {
            peer,
            loader,
            _cache: cache,
            _assets: assets,
        }
    }

    fn fetch_effective(fx: &Fixture, kind: ResourceKind, url: &str) -> String {
        fx.peer
            .fetch(ResourceRequest::new(kind, url))
            .unwrap()
            .wait()
            .unwrap()
            .effective_url
    }

    #[test]
    fn test_builder_requires_directories() {
        assert!(matches!(
            Atlas::builder().build(),
            Err(AtlasError::MissingCacheDirectory)
        ));
        assert!(matches!(
            Atlas::builder().with_cache_directory("/tmp/c").build(),
            Err(AtlasError::MissingAssetDirectory)
        ));
    }

    #[test]
    fn test_no_transform_is_pass_through_for_any_url() {
        let fx = fixture(2);
        fx.peer.set_transform(None);

        for url in ["http://a/x.pbf", "asset://sprite.png", "weird:///u?q=1", ""] {
            assert_eq!(fetch_effective(&fx, ResourceKind::Tile, url), url);
        }
    }

    #[test]
    fn test_identity_transform_is_observably_pass_through() {
        let fx = fixture(2);
        fx.peer
            .set_transform(Some(Arc::new(|_: ResourceKind, url: &str| url.to_owned())));

        for url in ["http://a/x.pbf", "asset://glyphs/0-255.pbf"] {
            assert_eq!(fetch_effective(&fx, ResourceKind::Glyph, url), url);
        }
    }

    #[test]
    fn test_scenario_tile_rewrite_reaches_the_loader() {
        let fx = fixture(2);
        fx.peer.set_transform(Some(Arc::new(|kind: ResourceKind, url: &str| {
            if kind == ResourceKind::Tile {
                url.replace("http://a/", "http://b/")
            } else {
                url.to_owned()
            }
        })));

        assert_eq!(
            fetch_effective(&fx, ResourceKind::Tile, "http://a/x.pbf"),
            "http://b/x.pbf"
        );
        // The engine actually fetched the rewritten URL.
        assert_eq!(fx.loader.urls(), vec!["http://b/x.pbf"]);
    }

    #[test]
    fn test_scenario_reset_restores_original_urls() {
        let fx = fixture(2);
        fx.peer.set_transform(Some(Arc::new(|_: ResourceKind, url: &str| {
            url.replace("http://a/", "http://b/")
        })));
        assert_eq!(
            fetch_effective(&fx, ResourceKind::Tile, "http://a/x.pbf"),
            "http://b/x.pbf"
        );

        fx.peer.set_transform(None);
        assert_eq!(
            fetch_effective(&fx, ResourceKind::Tile, "http://a/x.pbf"),
            "http://a/x.pbf"
        );
        assert_eq!(fx.loader.urls(), vec!["http://b/x.pbf", "http://a/x.pbf"]);
    }

    #[test]
    fn test_panicking_transform_degrades_to_pass_through() {
        let fx = fixture(2);
        fx.peer.set_transform(Some(Arc::new(
            |_: ResourceKind, url: &str| -> String {
                if url.contains("bad") {
                    panic!("host callback failure");
                }
                format!("{}?ok", url)
            },
        )));

        assert_eq!(
            fetch_effective(&fx, ResourceKind::Tile, "http://a/bad.pbf"),
            "http://a/bad.pbf"
        );
        // Unrelated fetches keep rewriting.
        assert_eq!(
            fetch_effective(&fx, ResourceKind::Tile, "http://a/good.pbf"),
            "http://a/good.pbf?ok"
        );
    }

    /// Transform that blocks inside `on_url` until released, and flags its
    /// own drop.
    struct BlockingTransform {
        entered: Arc<Barrier>,
        release: Arc<Barrier>,
        dropped: Arc<AtomicBool>,
    }

    impl ResourceTransform for BlockingTransform {
        fn on_url(&self, _kind: ResourceKind, url: &str) -> String {
            self.entered.wait();
            self.release.wait();
            url.replace("http://a/", "http://old/")
        }
    }

    impl Drop for BlockingTransform {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_replacing_transform_under_in_flight_invocations() {
        const IN_FLIGHT: usize = 3;

        let fx = fixture(IN_FLIGHT);
        let entered = Arc::new(Barrier::new(IN_FLIGHT + 1));
        let release = Arc::new(Barrier::new(IN_FLIGHT + 1));
        let dropped = Arc::new(AtomicBool::new(false));

        fx.peer.set_transform(Some(Arc::new(BlockingTransform {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
            dropped: Arc::clone(&dropped),
        })));

        let handles: Vec<_> = (0..IN_FLIGHT)
            .map(|i| {
                fx.peer
                    .fetch(ResourceRequest::new(
                        ResourceKind::Tile,
                        format!("http://a/{}.pbf", i),
                    ))
                    .unwrap()
            })
            .collect();

        // All workers are now blocked inside the old transform.
        entered.wait();

        // Replace it mid-flight. The old handle must survive until the last
        // in-flight invocation returns.
        fx.peer.set_transform(Some(Arc::new(|_: ResourceKind, url: &str| {
            url.replace("http://a/", "http://new/")
        })));
        assert!(!dropped.load(Ordering::SeqCst));

        release.wait();
        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.wait().unwrap();
            // Every in-flight invocation completed with the old mapping.
            assert_eq!(result.effective_url, format!("http://old/{}.pbf", i));
        }
        assert!(dropped.load(Ordering::SeqCst));

        // Later fetches use the replacement.
        assert_eq!(
            fetch_effective(&fx, ResourceKind::Tile, "http://a/z.pbf"),
            "http://new/z.pbf"
        );
    }

    /// Transform that counts invocations and sleeps to keep them in flight.
    struct CountingTransform {
        invocations: Arc<AtomicUsize>,
    }

    impl ResourceTransform for CountingTransform {
        fn on_url(&self, _kind: ResourceKind, url: &str) -> String {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            url.to_owned()
        }
    }

    #[test]
    fn test_destroy_with_fetches_in_flight() {
        let fx = fixture(2);
        let invocations = Arc::new(AtomicUsize::new(0));

        fx.peer.set_transform(Some(Arc::new(CountingTransform {
            invocations: Arc::clone(&invocations),
        })));

        for i in 0..6 {
            fx.peer
                .fetch(ResourceRequest::new(
                    ResourceKind::Tile,
                    format!("http://a/{}.pbf", i),
                ))
                .unwrap();
        }

        // Destroy while fetches are in flight: must not crash, and once it
        // returns no further invocation may be attempted.
        fx.peer.destroy();
        let after_destroy = invocations.load(Ordering::SeqCst);

        assert!(matches!(
            fx.peer
                .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf")),
            Err(PeerError::Destroyed)
        ));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(invocations.load(Ordering::SeqCst), after_destroy);
        assert!(!fx.peer.transform_installed());
    }

    #[test]
    fn test_host_operations_round_trip() {
        let cache = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let loader = Arc::new(RecordingLoader::new());

        let config = EngineConfig::new(cache.path(), assets.path()).with_worker_threads(1);
        let id = initialize_with(config, Arc::clone(&loader) as _).unwrap();

        let handle: TransformHandle = Arc::new(|_: ResourceKind, url: &str| {
            url.replace("http://a/", "http://b/")
        });
        set_resource_transform(id, Some(handle));

        let result = atlas_peer::peer(id)
            .unwrap()
            .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf"))
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(result.effective_url, "http://b/x.pbf");

        finalize(id);
        assert!(atlas_peer::peer(id).is_none());
    }
}
