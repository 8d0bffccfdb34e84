//! # outrider-core
//!
//! Core types, errors, and utilities for the Outrider alerting daemon.
//!
//! This crate provides:
//! - [`OutriderError`] - Configuration, I/O, and parsing errors
//! - [`logging`] - Tracing setup and log management utilities
//! - [`types`] - Shared type definitions used across Outrider crates
//! - [`geo`] - Great-circle distance math
//! - [`clock`] - Injectable clock for testable time handling
//! - [`config`] - Daemon configuration loading and validation
//!
//! ## Example
//!
//! ```no_run
//! use outrider_core::{config, logging};
//!
//! fn main() -> outrider_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!
//!     let path = config::default_config_path()?;
//!     let cfg = config::Config::load(&path)?;
//!     tracing::info!(delay_secs = cfg.alerts.accident_confirm_delay_secs, "configured");
//!
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod geo;
pub mod logging;
pub mod types;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{OutriderError, Result};
pub use logging::{LogGuard, init_logging};
pub use types::{AlertKind, GeoPoint, Recipient, VehicleId, VehicleSettings, VehicleSnapshot};
