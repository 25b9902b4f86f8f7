//! Error types for remote API calls.

use thiserror::Error;

/// Result type alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by a `TaskApi` implementation.
///
/// Every variant is treated as transient by the sync layer: the operation
/// that triggered it stays queued and is retried later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Connection could not be established or was interrupted.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Server answered with a non-success status code.
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// Response body could not be decoded.
    #[error("Invalid response: {0}")]
    Decode(String),

    /// Configured base URL is unusable.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Status code for `Status` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server reported the target entity as missing.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 404,
            message: "One-off todo not found".to_string(),
        };
        assert_eq!(err.to_string(), "Server returned 404: One-off todo not found");
        assert!(err.is_not_found());

        assert_eq!(ApiError::Timeout.to_string(), "Request timed out");
        assert_eq!(ApiError::Timeout.status_code(), None);
    }
}
