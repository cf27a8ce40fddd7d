//! Error types for the peer layer.

use thiserror::Error;

/// Errors from peer operations.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The underlying fetch engine failed.
    #[error("Engine error: {0}")]
    Engine(#[from] atlas_engine::EngineError),

    /// The peer has already been destroyed.
    #[error("Peer already destroyed")]
    Destroyed,
}

/// Result type alias for peer operations.
pub type PeerResult<T> = std::result::Result<T, PeerError>;
