//! Transform invocation.
//!
//! The invoker performs the actual call into host code for a single
//! resource request, given a snapshot of the slot's handle taken at call
//! time. It is the boundary at which host failures are absorbed: no panic
//! originating in a transform may escape into the fetch engine.

use std::panic::{self, AssertUnwindSafe};

use tracing::{trace, warn};

use crate::request::ResourceRequest;
use crate::transform::TransformHandle;

/// Invokes a host transform for one resource request.
pub struct TransformInvoker;

impl TransformInvoker {
    /// Compute the effective URL for a request.
    ///
    /// With no handle, the request URL is returned unchanged and no host
    /// call is made. With a handle, the host callback is invoked
    /// synchronously; the calling fetch worker thread blocks for its
    /// duration. URL rewriting is expected to be CPU-bound and fast, so no
    /// timeout is applied; a hanging callback stalls its worker.
    ///
    /// A panic unwinding from the callback is caught, logged, and treated
    /// as "no rewrite": the original URL is returned and unrelated fetches
    /// proceed normally.
    pub fn invoke(handle: Option<&TransformHandle>, request: &ResourceRequest) -> String {
        let Some(handle) = handle else {
            return request.url().to_owned();
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            handle.on_url(request.kind(), request.url())
        }));

        match result {
            Ok(url) => {
                trace!(
                    kind = %request.kind(),
                    url = request.url(),
                    effective_url = %url,
                    "Transform applied"
                );
                url
            }
            Err(payload) => {
                warn!(
                    kind = %request.kind(),
                    url = request.url(),
                    panic = panic_message(payload.as_ref()),
                    "Transform panicked; fetching original URL"
                );
                request.url().to_owned()
            }
        }
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string payload>"
    }
}
