//! Error types for notification dispatch.

use thiserror::Error;

/// Errors from the chat queue producer and the push sender.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// HTTP transport failure (connection refused, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The queue endpoint answered with a non-success status.
    #[error("queue publish failed ({status}): {body}")]
    Queue { status: u16, body: String },

    /// The push endpoint answered with a non-success status.
    #[error("push send failed ({status}): {body}")]
    Push { status: u16, body: String },

    /// Response body was not the JSON we expected.
    #[error("failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    /// Sender construction failed (bad endpoint, missing credential).
    #[error("dispatch configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the dispatch crate.
pub type Result<T> = std::result::Result<T, DispatchError>;
