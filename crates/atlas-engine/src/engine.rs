//! The fetch engine.
//!
//! This module provides the `FetchEngine` type: a pool of worker threads
//! that resolve resource requests. Before each fetch, a worker applies the
//! currently installed URL-transform function to compute the effective URL,
//! then resolves it through the configured [`ResourceLoader`].
//!
//! Network transport, cache eviction and the offline store's internal
//! schema are not this module's concern; the engine owns the offline store
//! *path* and validates it at construction time.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use atlas_bridge::{ResourceKind, ResourceRequest};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, LoadError};
use crate::loader::ResourceLoader;

/// URL-transform function installed into the engine.
///
/// Applied by a fetch worker to every request before it is resolved. The
/// function is called concurrently from multiple workers and must not
/// panic; host-supplied rewrite callbacks are wrapped by the bridge
/// invoker, which absorbs their failures before they reach the engine.
pub type UrlTransformFn = Arc<dyn Fn(ResourceKind, String) -> String + Send + Sync>;

/// One unit of work for a fetch worker.
struct FetchJob {
    request: ResourceRequest,
    reply: mpsc::Sender<FetchResult>,
}

/// Outcome of a single fetch.
#[derive(Debug)]
pub struct FetchResult {
    /// The request as originally issued.
    pub request: ResourceRequest,
    /// The URL that was actually fetched, after any transform.
    pub effective_url: String,
    /// The resource bytes, or why loading failed.
    pub body: Result<Bytes, LoadError>,
}

/// Handle to one in-flight fetch.
///
/// Dropping the handle cancels interest in the result: the fetch itself is
/// allowed to complete and its result is discarded.
#[derive(Debug)]
pub struct FetchHandle {
    receiver: mpsc::Receiver<FetchResult>,
}

impl FetchHandle {
    /// Block until the fetch completes.
    ///
    /// Returns `None` if the engine shut down before the fetch was
    /// processed.
    pub fn wait(self) -> Option<FetchResult> {
        self.receiver.recv().ok()
    }

    /// Block until the fetch completes or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<FetchResult> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

/// A fetch engine with its own worker-thread pool.
///
/// The engine is exclusively owned by its peer. [`shutdown`](Self::shutdown)
/// stops new fetches from starting and joins the workers, letting in-flight
/// fetches complete; it is idempotent, and `Drop` invokes it as a backstop.
pub struct FetchEngine {
    /// The installed URL-transform function, if any.
    transform: Arc<RwLock<Option<UrlTransformFn>>>,
    /// Job queue sender; `None` once shut down.
    sender: Mutex<Option<mpsc::Sender<FetchJob>>>,
    /// Worker thread handles, joined on shutdown.
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Set once shutdown has begun.
    shut_down: AtomicBool,
    /// Path of the offline store file.
    offline_database: PathBuf,
}

impl FetchEngine {
    /// Create an engine and spawn its worker pool.
    ///
    /// Validates that the cache directory exists (creating it if needed)
    /// and is writable by probing the offline store file, and that the
    /// asset directory exists. No transform is installed; every fetch
    /// passes its URL through unchanged until
    /// [`set_url_transform`](Self::set_url_transform) is called.
    pub fn create(config: EngineConfig, loader: Arc<dyn ResourceLoader>) -> EngineResult<Self> {
        let offline_database = prepare_cache_directory(&config)?;

        if !config.asset_directory.is_dir() {
            return Err(EngineError::AssetDirectory {
                path: config.asset_directory.clone(),
            });
        }

        let transform: Arc<RwLock<Option<UrlTransformFn>>> = Arc::new(RwLock::new(None));
        let (sender, receiver) = mpsc::channel::<FetchJob>();
        let receiver = Arc::new(Mutex::new(receiver));

        let worker_count = config.worker_threads.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let receiver = Arc::clone(&receiver);
            let transform = Arc::clone(&transform);
            let loader = Arc::clone(&loader);

            let handle = thread::Builder::new()
                .name(format!("atlas-fetch-{}", index))
                .spawn(move || worker_loop(receiver, transform, loader))
                .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;
            workers.push(handle);
        }

        info!(
            workers = worker_count,
            cache = %config.cache_directory.display(),
            assets = %config.asset_directory.display(),
            "Created fetch engine"
        );

        Ok(Self {
            transform,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            shut_down: AtomicBool::new(false),
            offline_database,
        })
    }

    /// Install or remove the URL-transform function.
    ///
    /// `None` restores unconditional pass-through. Replacing the function
    /// is safe while fetches are in flight: a worker that already took its
    /// per-request snapshot finishes with the function it snapshotted.
    pub fn set_url_transform(&self, transform: Option<UrlTransformFn>) {
        let installed = transform.is_some();
        *self.transform.write() = transform;
        debug!(installed, "URL transform updated");
    }

    /// Enqueue a fetch.
    ///
    /// Returns [`EngineError::ShutDown`] once shutdown has begun.
    pub fn fetch(&self, request: ResourceRequest) -> EngineResult<FetchHandle> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(EngineError::ShutDown);
        };

        let (reply, receiver) = mpsc::channel();
        sender
            .send(FetchJob { request, reply })
            .map_err(|_| EngineError::ShutDown)?;

        Ok(FetchHandle { receiver })
    }

    /// Shut the engine down.
    ///
    /// Closes the job queue and joins the workers: queued and in-flight
    /// fetches complete, then the pool exits. Idempotent; concurrent and
    /// repeated calls after the first are no-ops.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        // Dropping the sender closes the queue; workers drain and exit.
        drop(self.sender.lock().take());

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if let Err(payload) = handle.join() {
                warn!(?payload, "Fetch worker panicked before shutdown");
            }
        }

        info!("Fetch engine shut down");
    }

    /// Check whether shutdown has begun.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Path of the offline store file inside the cache directory.
    pub fn offline_database_path(&self) -> &Path {
        &self.offline_database
    }
}

impl Drop for FetchEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FetchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchEngine")
            .field("transform_installed", &self.transform.read().is_some())
            .field("shut_down", &self.is_shut_down())
            .field("offline_database", &self.offline_database)
            .finish()
    }
}

/// Ensure the cache directory exists and is writable.
///
/// Writability is probed by opening the offline store file for append,
/// creating it if absent.
fn prepare_cache_directory(config: &EngineConfig) -> EngineResult<PathBuf> {
    fs::create_dir_all(&config.cache_directory).map_err(|source| EngineError::CacheDirectory {
        path: config.cache_directory.clone(),
        source,
    })?;

    let database = config.offline_database_path();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&database)
        .map_err(|source| EngineError::CacheDirectory {
            path: database.clone(),
            source,
        })?;

    Ok(database)
}

fn worker_loop(
    receiver: Arc<Mutex<mpsc::Receiver<FetchJob>>>,
    transform: Arc<RwLock<Option<UrlTransformFn>>>,
    loader: Arc<dyn ResourceLoader>,
) {
    loop {
        // Take the next job; the receiver lock is released before the job
        // runs so other workers keep draining the queue.
        let job = { receiver.lock().recv() };
        let Ok(FetchJob { request, reply }) = job else {
            break;
        };

        // One snapshot per request: a transform installed mid-fetch applies
        // to the next request, not this one.
        let snapshot = transform.read().clone();
        let effective_url = match snapshot {
            Some(rewrite) => rewrite(request.kind(), request.url().to_owned()),
            None => request.url().to_owned(),
        };

        let body = loader.load(request.kind(), &effective_url);
        debug!(
            kind = %request.kind(),
            url = request.url(),
            effective_url = %effective_url,
            ok = body.is_ok(),
            "Fetch completed"
        );

        // The requester may have dropped its handle; a discarded result is
        // a cancellation, not an error.
        let _ = reply.send(FetchResult {
            request,
            effective_url,
            body,
        });
    }

    debug!("Fetch worker exiting");
}
