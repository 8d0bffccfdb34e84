//! Per-vehicle, per-kind notification cooldown.
//!
//! The limiter is the one shared mutable resource in the pipeline. Two
//! evaluations of the same vehicle can be in flight at once (the handlers
//! suspend on store reads), so the check-and-record must be a single critical
//! section: a `should_fire` that returns true has already recorded the new
//! firing time before the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use outrider_core::clock::{Clock, SystemClock};
use outrider_core::types::{AlertKind, VehicleId};

/// Cooldown tracker keyed by (vehicle, alert kind).
///
/// State is in-memory only; a process restart clears every cooldown. That is
/// accepted behavior, not something to paper over with persistence.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    last_fired: Mutex<HashMap<(VehicleId, AlertKind), Instant>>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Whether an alert of `kind` may fire for `vehicle_id` now.
    ///
    /// Returns true and records the firing time when the interval has elapsed
    /// since the last recorded firing (or none was recorded). Returns false
    /// without touching the record otherwise, so a suppressed alert does not
    /// extend the cooldown window.
    pub fn should_fire(&self, vehicle_id: &str, kind: AlertKind, interval: Duration) -> bool {
        let key = (vehicle_id.to_string(), kind);
        let now = self.clock.now();
        let mut last_fired = self.last_fired.lock().unwrap_or_else(|e| e.into_inner());
        let permitted = match last_fired.get(&key) {
            Some(last) => now.duration_since(*last) >= interval,
            None => true,
        };
        if permitted {
            last_fired.insert(key, now);
        }
        permitted
    }
}
