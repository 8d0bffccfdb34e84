//! Error types for store backends.

use thiserror::Error;

/// Errors surfaced by [`RealtimeStore`](crate::RealtimeStore) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP transport failure (connection refused, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status code.
    #[error("store request failed ({status}) at '{path}': {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    /// Response body was not the JSON we expected.
    #[error("failed to parse store response: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend construction failed (bad base URL, missing credential).
    #[error("store configuration error: {0}")]
    Config(String),

    /// The change stream ended abnormally or sent a terminal event.
    #[error("change stream error: {0}")]
    Stream(String),
}

impl StoreError {
    /// True when retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Http(_) | StoreError::Stream(_) => true,
            StoreError::Status { status, .. } => *status >= 500,
            StoreError::Json(_) | StoreError::Config(_) => false,
        }
    }
}

/// Convenience alias used throughout the store crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = StoreError::Status {
            status: 404,
            path: "settings/truck-7".to_string(),
            body: "not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("settings/truck-7"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Stream("connection reset".to_string()).is_retryable());
        assert!(
            StoreError::Status {
                status: 503,
                path: "vehicle".to_string(),
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(
            !StoreError::Status {
                status: 401,
                path: "vehicle".to_string(),
                body: String::new(),
            }
            .is_retryable()
        );
        assert!(!StoreError::Config("bad url".to_string()).is_retryable());
    }
}
