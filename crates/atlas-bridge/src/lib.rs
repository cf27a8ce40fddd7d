//! Atlas Transform Bridge
//!
//! This crate is the correctness-critical core of the Atlas resource
//! loader: the bridge that lets a host application rewrite resource URLs
//! before the fetch engine requests them. It includes:
//!
//! - [`ResourceRequest`] / [`ResourceKind`]: the request model
//! - [`ResourceTransform`] / [`TransformHandle`]: the host callback contract
//! - [`TransformSlot`]: holds the currently registered handle, with atomic
//!   replace-and-release
//! - [`TransformInvoker`]: performs one synchronous invocation, absorbing
//!   host failures at the boundary
//!
//! # Lifetime safety
//!
//! The slot and the invoker sit between two independently owned worlds: the
//! host, which registers and replaces transforms at will, and the engine's
//! fetch workers, which invoke the current transform concurrently. The
//! handle is reference-counted so that a snapshot taken for one invocation
//! keeps the transform alive even if the host replaces or removes it
//! mid-flight; the old transform is released when the slot reference and
//! every in-flight snapshot are gone.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use atlas_bridge::{ResourceKind, ResourceRequest, TransformInvoker, TransformSlot};
//!
//! let slot = TransformSlot::new();
//! slot.set(Some(Arc::new(|_: ResourceKind, url: &str| {
//!     url.replace("http://a/", "http://b/")
//! })));
//!
//! let request = ResourceRequest::new(ResourceKind::Tile, "http://a/0/0/0.pbf");
//! let effective = TransformInvoker::invoke(slot.snapshot().as_ref(), &request);
//! assert_eq!(effective, "http://b/0/0/0.pbf");
//! ```

pub mod invoker;
pub mod request;
pub mod slot;
pub mod transform;

// Re-export main types
pub use invoker::TransformInvoker;
pub use request::{ResourceKind, ResourceRequest};
pub use slot::TransformSlot;
pub use transform::{ResourceTransform, TransformHandle};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::invoker::TransformInvoker;
    pub use crate::request::{ResourceKind, ResourceRequest};
    pub use crate::slot::TransformSlot;
    pub use crate::transform::{ResourceTransform, TransformHandle};
}
