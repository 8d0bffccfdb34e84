//! Accident confirmation windows and emergency escalation.
//!
//! An accident trigger does not page the emergency contact immediately: the
//! crew gets a confirmation window to abort a false alarm. The pending
//! incident is persisted in the store together with its deadline, so a
//! restarted daemon re-arms outstanding windows instead of silently dropping
//! them. The in-process timer is never cancelled; an abort is observed when
//! the timer fires.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{error, info, warn};

use outrider_core::log_alert_event;
use outrider_core::types::{AlertKind, GeoPoint, Recipient};
use outrider_dispatch::Dispatcher;
use outrider_store::{paths, RealtimeStore};

use crate::error::Result;
use crate::settings::SettingsResolver;

/// Schedules and resolves accident confirmation windows.
pub struct EscalationTracker {
    store: Arc<dyn RealtimeStore>,
    dispatcher: Arc<Dispatcher>,
    settings: SettingsResolver,
}

impl EscalationTracker {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        dispatcher: Arc<Dispatcher>,
        settings: SettingsResolver,
    ) -> Self {
        Self {
            store,
            dispatcher,
            settings,
        }
    }

    /// Open a confirmation window: persist the pending incident with its
    /// deadline and arm the in-process timer.
    ///
    /// A second accident for the same vehicle overwrites the record; the
    /// superseded timer then finds the record already gone once the later
    /// window has resolved.
    pub async fn begin(self: &Arc<Self>, vehicle_id: &str, delay: Duration) -> Result<()> {
        let now = Utc::now().timestamp();
        let due_at = now + delay.as_secs() as i64;
        self.store
            .set(
                &paths::incident(vehicle_id),
                json!({"aborted": false, "created_at": now, "due_at": due_at}),
            )
            .await?;
        info!(vehicle_id = %vehicle_id, due_at = due_at, "accident confirmation window opened");
        self.arm(vehicle_id.to_string(), delay);
        Ok(())
    }

    /// Re-arm every pending incident found in the store, with whatever part
    /// of its window remains. Overdue windows resolve immediately. Called
    /// once at startup; returns the number of re-armed windows.
    pub async fn resume_pending(self: &Arc<Self>) -> Result<usize> {
        let Some(Value::Object(records)) = self.store.read(paths::INCIDENTS).await? else {
            return Ok(0);
        };
        let now = Utc::now().timestamp();
        let mut armed = 0;
        for (vehicle_id, record) in records {
            let due_at = record.get("due_at").and_then(Value::as_i64).unwrap_or(now);
            let remaining = Duration::from_secs(due_at.saturating_sub(now).max(0) as u64);
            info!(
                vehicle_id = %vehicle_id,
                remaining_secs = remaining.as_secs(),
                "re-armed pending confirmation window"
            );
            self.arm(vehicle_id, remaining);
            armed += 1;
        }
        Ok(armed)
    }

    fn arm(self: &Arc<Self>, vehicle_id: String, delay: Duration) {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = tracker.resolve(&vehicle_id).await {
                error!(vehicle_id = %vehicle_id, error = %e, "accident recheck failed");
            }
        });
    }

    /// The delayed recheck: look at the pending record and either stand down
    /// or page the emergency contact.
    async fn resolve(&self, vehicle_id: &str) -> Result<()> {
        match self.store.read(&paths::incident(vehicle_id)).await? {
            Some(record) if record.get("aborted").and_then(Value::as_bool) == Some(true) => {
                info!(vehicle_id = %vehicle_id, "accident aborted within the window");
                self.store.delete(&paths::incident(vehicle_id)).await?;
                return Ok(());
            }
            Some(_) => {}
            None => {
                warn!(
                    vehicle_id = %vehicle_id,
                    "pending record missing at deadline, escalating anyway"
                );
            }
        }
        self.escalate(vehicle_id).await
    }

    /// Page the emergency contact and close the incident. Settings are read
    /// fresh here; the window is long enough for them to have changed.
    async fn escalate(&self, vehicle_id: &str) -> Result<()> {
        let Some(number) = self.settings.emergency_number(vehicle_id).await? else {
            warn!(vehicle_id = %vehicle_id, "no emergency number configured, cannot escalate");
            self.store.delete(&paths::incident(vehicle_id)).await?;
            return Ok(());
        };
        let home = self
            .settings
            .vehicle_settings(vehicle_id)
            .await?
            .map(|settings| settings.home)
            .unwrap_or_default();
        let contact = Recipient::new(number, false);
        let message = emergency_message(vehicle_id, home);
        self.dispatcher
            .send_chat(vehicle_id, &contact, &message)
            .await;
        log_alert_event!(vehicle_id, AlertKind::Accident, "escalated to emergency contact");
        self.store.delete(&paths::incident(vehicle_id)).await?;
        Ok(())
    }
}

fn emergency_message(vehicle_id: &str, home: GeoPoint) -> String {
    format!(
        "EMERGENCY: vehicle {vehicle_id} reported an accident and the alert was \
         not aborted within the confirmation window. Please respond. \
         Registered location: https://maps.google.com/?q={lat},{lng}",
        lat = home.lat,
        lng = home.lng,
    )
}
