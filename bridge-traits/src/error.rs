use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unknown media resource: {0}")]
    UnknownResource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure means the requested object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BridgeError::NotFound(_) | BridgeError::Http { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
