//! # outrider-alerts
//!
//! The alerting pipeline: rule evaluators over the vehicle change stream,
//! per-vehicle notification rate limiting, and the accident confirmation
//! state machine.
//!
//! Four evaluators subscribe independently to the vehicle collection:
//! geofence breach, driver drowsiness, cabin intruder, and accident. Each
//! resolves the vehicle's settings and recipients fresh per event, consults
//! the shared rate limiter once, and dispatches through
//! [`outrider_dispatch::Dispatcher`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use outrider_alerts::AlertService;
//! use outrider_core::config::Config;
//! use outrider_dispatch::{Dispatcher, MockPush, MockQueue};
//! use outrider_store::MemoryStore;
//!
//! # async fn run() -> outrider_alerts::Result<()> {
//! let config = Config::default();
//! let store = Arc::new(MemoryStore::new());
//! let dispatcher = Arc::new(Dispatcher::new(
//!     store.clone(),
//!     Arc::new(MockQueue::new()),
//!     Arc::new(MockPush::new()),
//! ));
//! let service = AlertService::start(&config, store, dispatcher).await?;
//! // ... run until shutdown ...
//! drop(service);
//! # Ok(())
//! # }
//! ```

pub mod accident;
pub mod drowsiness;
pub mod error;
pub mod escalation;
pub mod evaluator;
pub mod geofence;
pub mod intruder;
pub mod limiter;
pub mod service;
pub mod settings;

// Re-export main types for convenience
pub use accident::AccidentEvaluator;
pub use drowsiness::DrowsinessEvaluator;
pub use error::{AlertError, Result};
pub use escalation::EscalationTracker;
pub use evaluator::{run_evaluator, AlertContext, Evaluator};
pub use geofence::GeofenceEvaluator;
pub use intruder::IntruderEvaluator;
pub use limiter::RateLimiter;
pub use service::AlertService;
pub use settings::SettingsResolver;
