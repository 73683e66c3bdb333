//! Client error types
//!
//! Ordinary request failures (4xx/5xx, expired credentials, unreadable
//! bodies) are not errors: they come back as an [`ApiResponse`] with
//! `success == false`. `ClientError` covers what a caller cannot branch on.
//!
//! [`ApiResponse`]: crate::types::ApiResponse

use konata_core::CoreError;
use thiserror::Error;

/// Transport-level failures
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The backend could not be reached (refused, DNS, reset)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The transport gave up waiting for the backend
    #[error("Transport timed out")]
    Timeout,

    /// Any other failure while sending or reading the response
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the offline fallback may answer in place of the backend
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure with no offline answer for the endpoint
    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),

    /// The per-request deadline expired
    #[error("Request timed out")]
    Timeout,

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Multipart upload was rejected or returned an unreadable body
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Credentials were refused
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The offline fallback recognised the endpoint but refused the request
    #[error("Offline request rejected: {0}")]
    OfflineRejected(String),

    /// Persisting or clearing the credential failed
    #[error("Token storage failed: {0}")]
    TokenStore(#[from] CoreError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_connection_errors_are_fallback_eligible() {
        assert!(TransportError::Connection("refused".into()).is_connection());
        assert!(!TransportError::Timeout.is_connection());
        assert!(!TransportError::Other("reset".into()).is_connection());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Upload("File too large".into());
        assert_eq!(err.to_string(), "Upload failed: File too large");

        let err = ClientError::from(TransportError::Connection("refused".into()));
        assert_eq!(err.to_string(), "Request failed: Connection failed: refused");
    }
}
