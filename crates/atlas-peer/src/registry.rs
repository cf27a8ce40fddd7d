//! Host-facing operations and the process-wide peer registry.
//!
//! Host bindings address peers by [`PeerId`] rather than by reference: the
//! registry maps ids to live peers, mirroring the native-peer association a
//! managed host keeps with its finalizable objects. The registry itself is
//! process-wide state, created once on first use and never replaced.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use atlas_bridge::TransformHandle;
use atlas_engine::{EngineConfig, ResourceLoader};

use crate::error::PeerResult;
use crate::peer::{EnginePeer, PeerId};

static REGISTRY: OnceLock<PeerRegistry> = OnceLock::new();

/// Process-wide table of live peers.
struct PeerRegistry {
    peers: DashMap<PeerId, Arc<EnginePeer>>,
}

fn registry() -> &'static PeerRegistry {
    REGISTRY.get_or_init(|| {
        debug!("Initialized peer registry");
        PeerRegistry {
            peers: DashMap::new(),
        }
    })
}

/// Construct and register a peer for the given directories.
///
/// The engine's offline store lives inside `cache_directory`; `asset://`
/// URLs resolve under `asset_directory`. Fails with an engine error if the
/// cache path is not writable or the asset path does not exist.
pub fn initialize(
    cache_directory: impl Into<PathBuf>,
    asset_directory: impl Into<PathBuf>,
) -> PeerResult<PeerId> {
    let config = EngineConfig::new(cache_directory, asset_directory);
    register(EnginePeer::create(config)?)
}

/// Construct and register a peer with a custom config and loader.
pub fn initialize_with(
    config: EngineConfig,
    loader: Arc<dyn ResourceLoader>,
) -> PeerResult<PeerId> {
    register(EnginePeer::create_with_loader(config, loader)?)
}

fn register(peer: EnginePeer) -> PeerResult<PeerId> {
    let id = peer.id();
    registry().peers.insert(id, Arc::new(peer));
    info!(peer_id = %id, "Registered engine peer");
    Ok(id)
}

/// Look up a live peer by id.
pub fn peer(id: PeerId) -> Option<Arc<EnginePeer>> {
    registry().peers.get(&id).map(|entry| Arc::clone(entry.value()))
}

/// Install or remove the resource transform on a registered peer.
///
/// Addressing an unknown (never registered or already finalized) peer is a
/// usage error: an assertion in debug builds, a logged no-op in release
/// builds.
pub fn set_resource_transform(id: PeerId, callback: Option<TransformHandle>) {
    match peer(id) {
        Some(peer) => peer.set_transform(callback),
        None => unknown_peer(id, "set_resource_transform"),
    }
}

/// Finalize a registered peer: remove it from the registry and destroy it.
///
/// Invoked once by the host's finalization hook. Finalizing an unknown peer
/// is a usage error, handled like in [`set_resource_transform`].
pub fn finalize(id: PeerId) {
    match registry().peers.remove(&id) {
        Some((_, peer)) => peer.destroy(),
        None => unknown_peer(id, "finalize"),
    }
}

fn unknown_peer(id: PeerId, operation: &str) {
    debug_assert!(false, "{} addressed unknown peer {}", operation, id);
    warn!(peer_id = %id, operation, "Operation on unknown peer ignored");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use atlas_bridge::{ResourceKind, ResourceRequest};
    use atlas_engine::LoadError;

    struct RecordingLoader {
        urls: Mutex<Vec<String>>,
    }

    impl RecordingLoader {
        fn new() -> Self {
            Self {
                urls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ResourceLoader for RecordingLoader {
        fn load(&self, _kind: ResourceKind, url: &str) -> Result<Bytes, LoadError> {
            self.urls.lock().unwrap().push(url.to_owned());
            Ok(Bytes::from_static(b"payload"))
        }
    }

    #[test]
    fn test_initialize_and_finalize() {
        let cache = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();

        let id = initialize(cache.path(), assets.path()).unwrap();
        let registered = peer(id).expect("peer must be registered");
        assert_eq!(registered.id(), id);

        finalize(id);
        assert!(peer(id).is_none());
        assert!(registered.is_destroyed());
    }

    #[test]
    fn test_initialize_rejects_bad_cache_path() {
        let cache = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();

        let blocked = cache.path().join("occupied");
        std::fs::write(&blocked, b"").unwrap();

        assert!(initialize(&blocked, assets.path()).is_err());
    }

    #[test]
    fn test_transform_through_host_operations() {
        let cache = tempfile::tempdir().unwrap();
        let assets = tempfile::tempdir().unwrap();
        let loader = Arc::new(RecordingLoader::new());

        let config = EngineConfig::new(cache.path(), assets.path()).with_worker_threads(1);
        let id = initialize_with(config, Arc::clone(&loader) as _).unwrap();

        set_resource_transform(
            id,
            Some(Arc::new(|_: ResourceKind, url: &str| {
                url.replace("http://a/", "http://b/")
            })),
        );

        let result = peer(id)
            .unwrap()
            .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf"))
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(result.effective_url, "http://b/x.pbf");

        set_resource_transform(id, None);
        let result = peer(id)
            .unwrap()
            .fetch(ResourceRequest::new(ResourceKind::Tile, "http://a/x.pbf"))
            .unwrap()
            .wait()
            .unwrap();
        assert_eq!(result.effective_url, "http://a/x.pbf");

        finalize(id);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "unknown peer")]
    fn test_finalize_unknown_peer_is_loud_in_debug() {
        finalize(PeerId::new());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "unknown peer")]
    fn test_transform_on_unknown_peer_is_loud_in_debug() {
        set_resource_transform(PeerId::new(), None);
    }
}
