//! Atlas Peer Layer
//!
//! This crate ties the Atlas fetch engine to the lifetime of host-side
//! objects. It includes:
//!
//! - [`EnginePeer`]: owns one fetch engine and one transform slot,
//!   constructed by the host and destroyed exactly once by the host's
//!   finalization hook
//! - [`PeerId`] and the process-wide registry behind the host-facing
//!   operations [`initialize`], [`set_resource_transform`] and
//!   [`finalize`]
//!
//! # Lifecycle
//!
//! A peer moves through a single path: active with no transform, active
//! with a transform (re-entered on every [`EnginePeer::set_transform`]),
//! and finally destroyed, which is terminal. Destruction shuts the engine
//! down before releasing the registered transform handle, so no transform
//! invocation can be attempted once [`EnginePeer::destroy`] has returned,
//! and no new fetch can start once it has begun.

pub mod error;
pub mod peer;
pub mod registry;

// Re-export main types
pub use error::{PeerError, PeerResult};
pub use peer::{EnginePeer, PeerId};
pub use registry::{finalize, initialize, initialize_with, peer, set_resource_transform};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{PeerError, PeerResult};
    pub use crate::peer::{EnginePeer, PeerId};
    pub use crate::registry::{finalize, initialize, initialize_with, set_resource_transform};
}
