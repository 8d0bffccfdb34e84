//! The evaluator contract and the per-evaluator event loop.
//!
//! Every evaluator holds its own subscription to the vehicle change stream
//! and runs as an independent task. One change event therefore fans out to
//! all evaluators, and a failure inside one of them never stalls the others:
//! the loop catches per-event errors and keeps consuming.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use outrider_core::config::AlertsConfig;
use outrider_core::types::{AlertKind, Recipient, VehicleSettings, VehicleSnapshot};
use outrider_dispatch::{Dispatcher, PushNote};
use outrider_store::{paths, RealtimeStore};

use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::settings::SettingsResolver;

/// Everything an evaluator needs to decide and dispatch.
pub struct AlertContext {
    pub store: Arc<dyn RealtimeStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub settings: SettingsResolver,
    pub limiter: Arc<RateLimiter>,
    pub alerts: AlertsConfig,
}

impl AlertContext {
    /// Settings gate shared by all evaluators: `None` unless the vehicle has
    /// a settings record with alerting enabled.
    pub(crate) async fn enabled_settings(
        &self,
        vehicle_id: &str,
    ) -> Result<Option<VehicleSettings>> {
        match self.settings.vehicle_settings(vehicle_id).await? {
            Some(settings) if settings.enabled => Ok(Some(settings)),
            Some(_) => {
                debug!(vehicle_id = %vehicle_id, "alerting disabled in settings");
                Ok(None)
            }
            None => {
                debug!(vehicle_id = %vehicle_id, "vehicle has no settings record");
                Ok(None)
            }
        }
    }

    /// Recipient gate: an empty list means "nobody to notify" and has
    /// already been logged. The rate limiter must not have been consulted
    /// yet when this returns empty.
    pub(crate) async fn recipients_or_warn(
        &self,
        vehicle_id: &str,
        kind: AlertKind,
    ) -> Result<Vec<Recipient>> {
        let recipients = self.settings.recipients(vehicle_id).await?;
        if recipients.is_empty() {
            warn!(vehicle_id = %vehicle_id, kind = %kind, "no chat recipient registered, skipping alert");
        }
        Ok(recipients)
    }

    /// One cooldown consultation per evaluation. A true return has already
    /// recorded the firing.
    pub(crate) fn cooldown_permits(
        &self,
        vehicle_id: &str,
        kind: AlertKind,
        settings: &VehicleSettings,
    ) -> bool {
        let interval = Duration::from_secs(settings.notify_interval_min * 60);
        let permitted = self.limiter.should_fire(vehicle_id, kind, interval);
        if !permitted {
            debug!(vehicle_id = %vehicle_id, kind = %kind, "alert suppressed by cooldown");
        }
        permitted
    }

    /// Fan one alert out: the chat message to every recipient, then one push
    /// to the vehicle's devices. Delivery is best-effort.
    pub(crate) async fn dispatch_alert(
        &self,
        vehicle_id: &str,
        recipients: &[Recipient],
        message: &str,
        note: &PushNote,
    ) {
        for recipient in recipients {
            self.dispatcher.send_chat(vehicle_id, recipient, message).await;
        }
        self.dispatcher.send_push(vehicle_id, note).await;
    }
}

/// Footer shared by recurring alert messages: when the next alert can fire
/// and how to tune alerting from chat.
pub(crate) fn cooldown_footer(interval_min: u64) -> String {
    format!(
        "The next alert can fire after {interval_min} min.\n\
         Reply /notify off to stop alerts or /setinterval <min> to change the interval."
    )
}

/// One alert rule, attached to the vehicle change stream.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Cooldown and logging dimension of this evaluator.
    fn kind(&self) -> AlertKind;

    /// Inspect one changed vehicle record and dispatch if the rule fires.
    ///
    /// A missing or wrong-typed telemetry field is "no trigger", not an
    /// error; only store access failures should surface.
    async fn evaluate(&self, ctx: &AlertContext, snapshot: &VehicleSnapshot) -> Result<()>;
}

/// Subscribe `evaluator` to vehicle changes and drive it until the stream
/// closes.
pub async fn run_evaluator(ctx: Arc<AlertContext>, evaluator: Arc<dyn Evaluator>) {
    let mut events = ctx.store.watch_children(paths::VEHICLES).await;
    info!(kind = %evaluator.kind(), "evaluator subscribed to vehicle changes");
    while let Some(event) = events.recv().await {
        let snapshot = VehicleSnapshot::new(event.key, event.snapshot);
        if let Err(e) = evaluator.evaluate(&ctx, &snapshot).await {
            error!(
                kind = %evaluator.kind(),
                vehicle_id = %snapshot.vehicle_id(),
                error = %e,
                "evaluator failed for change event"
            );
        }
    }
    warn!(kind = %evaluator.kind(), "vehicle change stream closed");
}
