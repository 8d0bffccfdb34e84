//! Error types for alert evaluation.

use outrider_store::StoreError;
use thiserror::Error;

/// Errors an evaluator can surface to its event loop.
///
/// Notification delivery failures never appear here: the dispatch gateway
/// logs and swallows them. What remains is store access, which an evaluator
/// needs for settings, recipients and incident records.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Reading or writing the realtime store failed.
    #[error("store access failed: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the alerts crate.
pub type Result<T> = std::result::Result<T, AlertError>;
