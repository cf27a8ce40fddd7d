//! The transform slot.
//!
//! The slot is the single piece of state shared between host threads (which
//! install and replace transforms) and fetch worker threads (which read the
//! current transform once per request). It holds at most one registered
//! handle and supports atomic replace-and-release.

use parking_lot::RwLock;
use tracing::debug;

use crate::transform::TransformHandle;

/// Holds the currently registered transform handle, if any.
///
/// Replacing the handle is atomic with respect to readers: a concurrent
/// [`snapshot`](TransformSlot::snapshot) observes either the old handle or
/// the new one, and whichever it observes stays alive for the duration of
/// that snapshot regardless of later [`set`](TransformSlot::set) calls.
///
/// The lock is held only long enough to copy a reference. It is never held
/// across the host callback, so a slow transform cannot block an unrelated
/// `set` call.
#[derive(Default)]
pub struct TransformSlot {
    current: RwLock<Option<TransformHandle>>,
}

impl TransformSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new handle (or none), releasing the previous one.
    ///
    /// The strong reference previously held by the slot is released after
    /// the swap, once no new invocation can snapshot it. In-flight
    /// invocations that already took a snapshot keep the old handle alive
    /// until the last of them returns.
    ///
    /// Safe to call concurrently with `snapshot` from any thread, including
    /// the finalization path.
    pub fn set(&self, handle: Option<TransformHandle>) {
        let installed = handle.is_some();
        let previous = {
            let mut current = self.current.write();
            std::mem::replace(&mut *current, handle)
        };

        debug!(
            installed,
            replaced = previous.is_some(),
            "Transform slot updated"
        );

        // The previous handle is dropped here, outside the lock: a handle
        // whose teardown re-enters the slot must not deadlock.
        drop(previous);
    }

    /// Remove any registered handle.
    pub fn clear(&self) {
        self.set(None);
    }

    /// Take a strong reference to the currently registered handle.
    ///
    /// The returned handle is valid for one invocation, independent of any
    /// `set` calls that happen after the snapshot is taken.
    pub fn snapshot(&self) -> Option<TransformHandle> {
        self.current.read().clone()
    }

    /// Check whether a transform is currently registered.
    pub fn is_installed(&self) -> bool {
        self.current.read().is_some()
    }
}

impl std::fmt::Debug for TransformSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformSlot")
            .field("installed", &self.is_installed())
            .finish()
    }
}
