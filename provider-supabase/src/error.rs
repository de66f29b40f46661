//! Error types for the Supabase storage provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Supabase storage provider errors
#[derive(Error, Debug)]
pub enum SupabaseStorageError {
    /// API request returned a non-success status
    #[error("Supabase storage API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Retries exhausted on 429/5xx
    #[error("Supabase storage unavailable after {attempts} attempts (last status {status_code})")]
    RetriesExhausted { attempts: u32, status_code: u16 },

    #[error("Object not found: {path}")]
    ObjectNotFound { path: String },

    /// Failed to parse API response
    #[error("Failed to parse storage response: {0}")]
    ParseError(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for Supabase storage operations
pub type Result<T> = std::result::Result<T, SupabaseStorageError>;

impl From<SupabaseStorageError> for BridgeError {
    fn from(error: SupabaseStorageError) -> Self {
        match error {
            SupabaseStorageError::ObjectNotFound { path } => BridgeError::NotFound(path),
            SupabaseStorageError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            SupabaseStorageError::Bridge(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SupabaseStorageError::ApiError {
            status_code: 401,
            message: "Invalid JWT".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Supabase storage API error (status 401): Invalid JWT"
        );
    }

    #[test]
    fn test_error_conversion() {
        let missing: BridgeError = SupabaseStorageError::ObjectNotFound {
            path: "files/a.mp3".to_string(),
        }
        .into();
        assert!(missing.is_not_found());

        let exhausted: BridgeError = SupabaseStorageError::RetriesExhausted {
            attempts: 3,
            status_code: 503,
        }
        .into();
        assert!(matches!(exhausted, BridgeError::OperationFailed(_)));

        let parse: BridgeError = SupabaseStorageError::ParseError("eof".to_string()).into();
        assert!(parse.to_string().contains("eof"));
    }
}
