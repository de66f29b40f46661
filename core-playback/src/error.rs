//! # Playback Error Types
//!
//! Errors surfaced by the playlist source and the playback controller. Every
//! variant is cheap to clone so the controller can keep the last one in its
//! session state while also returning it to the caller.

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Listing or downloading from remote storage failed.
    #[error("Failed to fetch audio: {message}")]
    Fetch { message: String, transient: bool },

    // ========================================================================
    // Media Errors
    // ========================================================================
    /// The media backend could not parse the downloaded content, reported an
    /// error signal, or never reported metadata in time.
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// A transport command on the media backend failed.
    #[error("Media backend error: {0}")]
    Backend(String),

    // ========================================================================
    // Control Errors
    // ========================================================================
    /// Requested track index is outside the playlist.
    #[error("Track index {index} is out of range (playlist has {len} tracks)")]
    Index { index: usize, len: usize },

    #[error("Invalid playback configuration: {0}")]
    Config(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Wrap a storage failure. 429/5xx and transport failures are transient;
    /// missing objects and client errors are not.
    pub fn fetch(error: BridgeError) -> Self {
        let transient = match &error {
            BridgeError::Http { status, .. } => *status == 429 || *status >= 500,
            BridgeError::NotFound(_) => false,
            BridgeError::OperationFailed(_) | BridgeError::Io(_) => true,
            BridgeError::NotAvailable(_) | BridgeError::UnknownResource(_) => false,
        };

        PlaybackError::Fetch {
            message: error.to_string(),
            transient,
        }
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::Fetch { transient: true, .. })
    }

    /// Returns `true` if the caller asked for something impossible.
    pub fn is_user_error(&self) -> bool {
        matches!(self, PlaybackError::Index { .. })
    }

    /// Returns `true` if this error is related to the audio content itself.
    pub fn is_format_error(&self) -> bool {
        matches!(self, PlaybackError::Decode(_))
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(error: BridgeError) -> Self {
        PlaybackError::Backend(error.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
