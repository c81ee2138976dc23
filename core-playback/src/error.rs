//! # Playback Error Types
//!
//! Error types for queue, session and download operations.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// Song list and the player's source list disagree in length.
    #[error("Queue inconsistent: {songs} songs but {sources} prepared sources")]
    QueueInconsistent { songs: usize, sources: usize },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Operation issued after `release()`.
    #[error("Session already released")]
    SessionReleased,

    /// Operation requires a video surface that was never attached.
    #[error("No video surface attached")]
    NoSurface,

    // ========================================================================
    // Playlist Errors
    // ========================================================================
    /// Playlist JSON could not be encoded or decoded.
    #[error("Playlist format error: {0}")]
    PlaylistFormat(#[from] serde_json::Error),

    // ========================================================================
    // Platform/Adapter Errors
    // ========================================================================
    /// The host player, download engine or surface registry failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` when the error means the session's bookkeeping can no
    /// longer be trusted.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            PlaybackError::QueueInconsistent { .. } | PlaybackError::Internal(_)
        )
    }

    /// Returns `true` if the error came from the host side.
    pub fn is_bridge_error(&self) -> bool {
        matches!(self, PlaybackError::Bridge(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
