use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),
}

impl CoreError {
    /// Whether the host can fix this by supplying a missing bridge.
    pub fn is_capability_missing(&self) -> bool {
        matches!(
            self,
            CoreError::CapabilityMissing { .. }
                | CoreError::Runtime(core_runtime::Error::CapabilityMissing { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
