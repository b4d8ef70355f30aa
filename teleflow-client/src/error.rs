//! Error types for the Teleflow client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Teleflow client
///
/// No variant is retried internally. Read-only calls (`list`, `get`,
/// `download`) are safe for the caller to retry on [`ClientError::Transport`];
/// `save`, `delete`, and `run` are not guaranteed idempotent by the backend
/// and must not be blindly retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Workflow document is malformed or incompatible
    #[error(transparent)]
    Schema(#[from] teleflow_core::SchemaError),

    /// Run inputs do not satisfy the workflow's input definitions
    #[error(transparent)]
    InputValidation(#[from] teleflow_core::InputValidationError),

    /// The backend rejected a provisioning request (quota, invalid config)
    #[error("provisioning failed: {0}")]
    Provision(String),

    /// A local VM or tool server could not be reached
    #[error("connection failed: {0}")]
    Connection(String),

    /// HTTP request failed in transit
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse a response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// WebSocket channel failed
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Local filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive packing or extraction failed
    #[error("archive error: {0}")]
    Archive(String),

    /// The operation was invoked with inconsistent arguments
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        let not_found = ClientError::api_error(404, "no such computer");
        assert!(not_found.is_not_found());
        assert!(not_found.is_client_error());
        assert!(!not_found.is_server_error());

        let server = ClientError::api_error(503, "overloaded");
        assert!(server.is_server_error());
        assert!(!server.is_client_error());

        assert!(!ClientError::Provision("quota".to_string()).is_client_error());
    }
}
