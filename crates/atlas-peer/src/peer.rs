//! The engine peer.
//!
//! An `EnginePeer` ties one fetch engine and its transform slot to the
//! lifetime of a host-side object. The host constructs the peer, may
//! install and replace a resource transform any number of times, and
//! destroys the peer exactly once from its finalization hook.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use atlas_bridge::{ResourceRequest, TransformHandle, TransformInvoker, TransformSlot};
use atlas_engine::{
    AssetLoader, EngineConfig, FetchEngine, FetchHandle, ResourceLoader, UrlTransformFn,
};

use crate::error::{PeerError, PeerResult};

/// Unique identifier for an engine peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Create a new random peer ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns one fetch engine and its transform slot, 1:1 with a host object.
///
/// The association is established at construction and never reassigned.
/// Destruction is single-shot: the host's finalization hook calls
/// [`destroy`](Self::destroy) exactly once; `Drop` invokes it as a backstop
/// so the engine is never leaked, but hosts must not rely on implicit drop
/// timing.
pub struct EnginePeer {
    /// Identity of this peer.
    id: PeerId,
    /// The owned fetch engine.
    engine: FetchEngine,
    /// The transform slot, shared with the engine-side rewrite closure.
    slot: Arc<TransformSlot>,
    /// Set once destruction has begun.
    destroyed: AtomicBool,
}

impl EnginePeer {
    /// Create a peer with the default `asset://` loader.
    ///
    /// The engine starts with a pass-through transform: every fetch uses
    /// its original URL until [`set_transform`](Self::set_transform)
    /// installs a handle.
    pub fn create(config: EngineConfig) -> PeerResult<Self> {
        let loader = Arc::new(AssetLoader::new(&config.asset_directory));
        Self::create_with_loader(config, loader)
    }

    /// Create a peer with a custom resource loader.
    pub fn create_with_loader(
        config: EngineConfig,
        loader: Arc<dyn ResourceLoader>,
    ) -> PeerResult<Self> {
        let engine = FetchEngine::create(config, loader)?;
        let id = PeerId::new();

        info!(peer_id = %id, "Created engine peer");

        Ok(Self {
            id,
            engine,
            slot: Arc::new(TransformSlot::new()),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Get the peer ID.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Check whether a transform is currently installed.
    pub fn transform_installed(&self) -> bool {
        self.slot.is_installed()
    }

    /// Check whether destruction has begun.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Path of the engine's offline store file.
    pub fn offline_database_path(&self) -> &std::path::Path {
        self.engine.offline_database_path()
    }

    /// Install or remove the resource transform.
    ///
    /// Stores the handle in the slot, then installs into the engine a
    /// rewrite function that snapshots the slot once per request and
    /// invokes the snapshotted handle through the bridge invoker. The
    /// closure captures the slot by shared ownership, so it stays valid
    /// however often the host replaces the handle afterwards.
    ///
    /// Installing `None` restores unconditional pass-through. The call is
    /// idempotent and may be repeated with the same handle.
    pub fn set_transform(&self, handle: Option<TransformHandle>) {
        if self.refuse_if_destroyed("set_transform") {
            return;
        }

        let installed = handle.is_some();
        self.slot.set(handle);

        if installed {
            let slot = Arc::clone(&self.slot);
            let rewrite: UrlTransformFn = Arc::new(move |kind, url| {
                let request = ResourceRequest::new(kind, url);
                TransformInvoker::invoke(slot.snapshot().as_ref(), &request)
            });
            self.engine.set_url_transform(Some(rewrite));
        } else {
            self.engine.set_url_transform(None);
        }

        debug!(peer_id = %self.id, installed, "Resource transform updated");
    }

    /// Issue a fetch through the owned engine.
    pub fn fetch(&self, request: ResourceRequest) -> PeerResult<FetchHandle> {
        if self.is_destroyed() {
            return Err(PeerError::Destroyed);
        }
        Ok(self.engine.fetch(request)?)
    }

    /// Destroy the peer.
    ///
    /// Shuts the engine down (no fetch can start afterwards, and the worker
    /// join guarantees no transform invocation is attempted after this
    /// returns), then releases any handle still held by the slot. Called at
    /// most once per peer by the host's finalization hook; a second call is
    /// a usage error: an assertion in debug builds, a logged no-op in
    /// release builds. Safe to call even if `set_transform` was never
    /// invoked.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            debug_assert!(false, "EnginePeer::destroy called twice");
            warn!(peer_id = %self.id, "Duplicate destroy ignored");
            return;
        }

        self.engine.shutdown();
        self.slot.clear();

        info!(peer_id = %self.id, "Engine peer destroyed");
    }

    /// Log and refuse an operation on a destroyed peer.
    fn refuse_if_destroyed(&self, operation: &str) -> bool {
        if !self.is_destroyed() {
            return false;
        }
        debug_assert!(false, "EnginePeer::{operation} called after destroy");
        warn!(peer_id = %self.id, operation, "Operation on destroyed peer ignored");
        true
    }
}

impl Drop for EnginePeer {
    fn drop(&mut self) {
        if !self.is_destroyed() {
            self.destroy();
        }
    }
}

impl std::fmt::Debug for EnginePeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnginePeer")
            .field("id", &self.id)
            .field("transform_installed", &self.transform_installed())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use atlas_bridge::ResourceKind;
    use atlas_engine::LoadError;

    /// Loader that records every URL it is asked for.
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
        // Dropped before the temp directories below.
        peer: EnginePeer,
        loader: Arc<RecordingLoader>,
        _cache: tempfile::TempDir,
        _assets: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let cache = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let loader = Arc::new(RecordingLoader::new());
        let config = EngineConfig::new(cache.path(), assets.path()).with_worker_threads(2);
        let peer = EnginePeer::create_with_loader(config, Arc::clone(&loader) as _).unwrap();
        Fixture {
            peer,
            loader,
            _cache: cache,
            _assets: assets,
        }
    }

    #[test]
    fn test_new_peer_is_pass_through() {
        let fx = fixture();
        assert!(!fx.peer.transform_installed());

        let result = fx
            .peer
            .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf"))
            .unwrap()
            .wait()
            .unwrap();

        assert_eq!(result.effective_url, "http://a/x.pbf");
    }

    #[test]
    fn test_transform_rewrites_fetches() {
        let fx = fixture();
        fx.peer.set_transform(Some(Arc::new(|_: ResourceKind, url: &str| {
            url.replace("http://a/", "http://b/")
        })));
        assert!(fx.peer.transform_installed());

        let result = fx
            .peer
            .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf"))
            .unwrap()
            .wait()
            .unwrap();

        assert_eq!(result.effective_url, "http://b/x.pbf");
        assert_eq!(fx.loader.urls(), vec!["http://b/x.pbf"]);
    }

    #[test]
    fn test_removing_transform_restores_original_urls() {
        let fx = fixture();
        fx.peer.set_transform(Some(Arc::new(|_: ResourceKind, url: &str| {
            format!("{}?token=abc", url)
        })));
        fx.peer.set_transform(None);
        assert!(!fx.peer.transform_installed());

        let result = fx
            .peer
            .fetch(ResourceRequest::new(ResourceKind::Style, "http://a/style"))
            .unwrap()
            .wait()
            .unwrap();

        assert_eq!(result.effective_url, "http://a/style");
    }

    #[test]
    fn test_redundant_set_transform_is_idempotent() {
        let fx = fixture();
        let handle: TransformHandle =
            Arc::new(|_: ResourceKind, url: &str| format!("{}#v", url));

        fx.peer.set_transform(Some(Arc::clone(&handle)));
        fx.peer.set_transform(Some(Arc::clone(&handle)));
        fx.peer.set_transform(Some(handle));

        let result = fx
            .peer
            .fetch(ResourceRequest::new(ResourceKind::Glyph, "http://a/g"))
            .unwrap()
            .wait()
            .unwrap();

        assert_eq!(result.effective_url, "http://a/g#v");
    }

    #[test]
    fn test_destroy_without_transform() {
        let fx = fixture();
        fx.peer.destroy();
        assert!(fx.peer.is_destroyed());
    }

    #[test]
    fn test_destroy_releases_engine_and_handle() {
        let fx = fixture();
        fx.peer
            .set_transform(Some(Arc::new(|_: ResourceKind, url: &str| url.to_owned())));

        fx.peer.destroy();

        assert!(fx.peer.is_destroyed());
        assert!(!fx.peer.transform_installed());
    }

    #[test]
    fn test_fetch_after_destroy_is_refused() {
        let fx = fixture();
        fx.peer.destroy();

        let result = fx
            .peer
            .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf"));
        assert!(matches!(result, Err(PeerError::Destroyed)));
        assert!(fx.loader.urls().is_empty());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "destroy called twice")]
    fn test_double_destroy_is_loud_in_debug() {
        let fx = fixture();
        fx.peer.destroy();
        fx.peer.destroy();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "called after destroy")]
    fn test_set_transform_after_destroy_is_loud_in_debug() {
        let fx = fixture();
        fx.peer.destroy();
        fx.peer
            .set_transform(Some(Arc::new(|_: ResourceKind, url: &str| url.to_owned())));
    }

    #[test]
    fn test_drop_backstop_destroys_peer() {
        let fx = fixture();
        let loader = Arc::clone(&fx.loader);

        fx.peer
            .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf"))
            .unwrap()
            .wait()
            .unwrap();

        // Dropping an undestroyed peer shuts the engine down cleanly.
        drop(fx);
        assert_eq!(loader.urls(), vec!["http://a/x.pbf"]);
    }
}
