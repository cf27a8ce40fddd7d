//! Host-supplied resource transforms.
//!
//! A transform is a host-owned callable that rewrites a resource URL before
//! the engine fetches it: adding or removing query parameters, rerouting
//! requests to a different server, and so on. The rewrite logic lives
//! entirely in host code; the engine only holds an opaque, reference-counted
//! handle to it.

use std::sync::Arc;

use crate::request::ResourceKind;

/// A URL-rewriting callback supplied by the host.
///
/// Implementations must be callable concurrently: the engine invokes the
/// transform from multiple fetch worker threads without serializing distinct
/// requests against each other.
///
/// A panic unwinding out of [`on_url`](ResourceTransform::on_url) is treated
/// as a callback failure: the invocation that triggered it falls back to the
/// original URL, and unrelated fetches are unaffected.
pub trait ResourceTransform: Send + Sync {
    /// Rewrite the URL for one resource request.
    ///
    /// Returns the URL the engine will actually fetch. Returning the input
    /// unchanged is valid and equivalent to having no transform installed.
    fn on_url(&self, kind: ResourceKind, url: &str) -> String;
}

/// A shared, reference-counted handle to a host transform.
///
/// The slot holds one strong reference while the transform is registered;
/// every in-flight invocation holds one additional strong reference for its
/// duration. The transform is released when the last holder drops.
pub type TransformHandle = Arc<dyn ResourceTransform>;

impl<F> ResourceTransform for F
where
    F: Fn(ResourceKind, &str) -> String + Send + Sync,
{
    fn on_url(&self, kind: ResourceKind, url: &str) -> String {
        self(kind, url)
    }
}
