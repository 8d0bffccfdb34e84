//! Logging infrastructure for Outrider.
//!
//! This module provides structured logging using the `tracing` ecosystem.
//! The daemon keeps its own JSON log files so alert decisions can be audited
//! after the fact, while the console shows a compact operator view.
//!
//! ## Features
//!
//! - JSON lines format for machine parsing
//! - File output to `~/.outrider/logs/outrider.log`
//! - Console output with configurable verbosity
//! - `--verbose` flag support for debug logging
//!
//! ## Example
//!
//! ```no_run
//! use outrider_core::logging;
//!
//! // Initialize logging (call once at startup)
//! let _guard = logging::init_logging(None, false).expect("logging init");
//!
//! // Use tracing macros
//! tracing::info!("outrider started");
//! tracing::debug!(vehicle_id = "truck-17", "evaluating geofence");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{OutriderError, Result};

/// Guard that must be held to ensure log flushing on shutdown.
///
/// When this guard is dropped, it flushes any pending log entries.
/// Keep this guard alive for the lifetime of the application.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the Outrider logging system.
///
/// This sets up:
/// - File logging to `~/.outrider/logs/outrider.log` (JSON lines format)
/// - Console logging to stderr (human-readable format)
///
/// # Arguments
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.outrider/logs/`
/// * `verbose` - If true, sets log level to DEBUG. Otherwise uses INFO.
///
/// # Returns
///
/// A [`LogGuard`] that must be held for the application lifetime to ensure
/// logs are properly flushed on shutdown.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    // Determine log directory
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    // Ensure log directory exists
    std::fs::create_dir_all(&log_dir).map_err(|e| OutriderError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    // Set up file appender for JSON logs
    let file_appender = tracing_appender::rolling::daily(&log_dir, "outrider.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    // Determine log level based on verbose flag and environment
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("outrider={default_level}")));

    // JSON layer for file output
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    // Human-readable layer for console output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    // Combine layers with filter
    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for testing.
///
/// This is a simpler alternative to [`init_logging`] that only logs to stderr.
/// Useful for tests and development.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Get the default log directory path.
///
/// Returns `~/.outrider/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| OutriderError::Internal {
        message: "HOME environment variable not set".into(),
    })?;

    Ok(PathBuf::from(home).join(".outrider").join("logs"))
}

/// Convenience macro for logging alert dispatch decisions.
///
/// # Example
///
/// ```ignore
/// log_alert_event!("truck-17", "geofence", "dispatched");
/// log_alert_event!("truck-17", "accident", "suppressed", reason = "cooldown");
/// ```
#[macro_export]
macro_rules! log_alert_event {
    ($vehicle_id:expr, $kind:expr, $event:expr) => {
        tracing::info!(
            vehicle_id = %$vehicle_id,
            kind = %$kind,
            event = $event,
            "alert event"
        )
    };
    ($vehicle_id:expr, $kind:expr, $event:expr, $($field:tt)*) => {
        tracing::info!(
            vehicle_id = %$vehicle_id,
            kind = %$kind,
            event = $event,
            $($field)*,
            "alert event"
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir() {
        // Set HOME for test (unsafe in Rust 2024 due to potential data races)
        // SAFETY: We are in a test context and this is the only test modifying HOME
        unsafe { std::env::set_var("HOME", "/tmp/test-home") };
        let dir = default_log_dir().unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/test-home/.outrider/logs"));
    }

    #[test]
    fn test_init_test_logging() {
        // Should not panic
        init_test_logging();
    }
}
