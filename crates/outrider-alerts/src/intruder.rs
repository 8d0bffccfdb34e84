//! Intruder evaluator.
//!
//! The face-detection bridge writes a status per vehicle; status 2 means an
//! unrecognized person is in the cabin. When the face handler service is
//! configured, the alert links the latest captured photo.

use async_trait::async_trait;
use tracing::debug;

use outrider_core::config::AlertsConfig;
use outrider_core::log_alert_event;
use outrider_core::types::{AlertKind, VehicleSnapshot};
use outrider_dispatch::PushNote;

use crate::error::Result;
use crate::evaluator::{cooldown_footer, AlertContext, Evaluator};

/// Face-detection status meaning "unrecognized person present".
const INTRUDER_STATUS: i64 = 2;

pub struct IntruderEvaluator;

#[async_trait]
impl Evaluator for IntruderEvaluator {
    fn kind(&self) -> AlertKind {
        AlertKind::Intruder
    }

    async fn evaluate(&self, ctx: &AlertContext, snapshot: &VehicleSnapshot) -> Result<()> {
        let vehicle_id = snapshot.vehicle_id();
        let Some(status) = snapshot.face_status() else {
            return Ok(());
        };
        if status != INTRUDER_STATUS {
            debug!(vehicle_id = %vehicle_id, status = status, "face status is not alerting");
            return Ok(());
        }
        let Some(settings) = ctx.enabled_settings(vehicle_id).await? else {
            return Ok(());
        };
        log_alert_event!(vehicle_id, AlertKind::Intruder, "unrecognized person detected");

        let recipients = ctx
            .recipients_or_warn(vehicle_id, AlertKind::Intruder)
            .await?;
        if recipients.is_empty() {
            return Ok(());
        }
        if !ctx.cooldown_permits(vehicle_id, AlertKind::Intruder, &settings) {
            return Ok(());
        }

        let message = format!(
            "Intruder alert: an unrecognized person was detected in vehicle {vehicle_id}. \
             Please verify who is driving.\n\n{footer}",
            footer = cooldown_footer(settings.notify_interval_min),
        );
        let note = intruder_note(vehicle_id, &ctx.alerts);
        ctx.dispatch_alert(vehicle_id, &recipients, &message, &note)
            .await;
        Ok(())
    }
}

fn intruder_note(vehicle_id: &str, alerts: &AlertsConfig) -> PushNote {
    let note = PushNote::new(
        "Intruder alert",
        format!("An unrecognized person was detected in vehicle {vehicle_id}."),
    );
    match intruder_photo_url(vehicle_id, alerts) {
        Some(url) => note.with_image(url),
        None => note,
    }
}

/// Latest cabin photo served by the face handler, when that service is
/// configured.
fn intruder_photo_url(vehicle_id: &str, alerts: &AlertsConfig) -> Option<String> {
    let base = alerts.face_handler_url.as_deref()?;
    Some(format!(
        "{}/{vehicle_id}/intruder_photo/latest.jpg",
        base.trim_end_matches('/')
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::RateLimiter;
    use crate::settings::SettingsResolver;
    use outrider_dispatch::{Dispatcher, MockPush, MockQueue};
    use outrider_store::{MemoryStore, RealtimeStore};
    use serde_json::json;
    use std::sync::Arc;

    fn harness(alerts: AlertsConfig) -> (Arc<MemoryStore>, Arc<MockQueue>, Arc<MockPush>, AlertContext) {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue::new());
        let push = Arc::new(MockPush::new());
        let ctx = AlertContext {
            store: store.clone(),
            dispatcher: Arc::new(Dispatcher::new(store.clone(), queue.clone(), push.clone())),
            settings: SettingsResolver::new(store.clone()),
            limiter: Arc::new(RateLimiter::with_system_clock()),
            alerts,
        };
        (store, queue, push, ctx)
    }

    async fn seed_vehicle(store: &MemoryStore) {
        store
            .set("settings/truck-7", json!({"radius": {"enabled": true}}))
            .await
            .unwrap();
        store
            .set(
                "wausers",
                json!({"62812@s.whatsapp.net": {"vehicleId": "truck-7"}}),
            )
            .await
            .unwrap();
    }

    fn snapshot_with_face_status(status: i64) -> VehicleSnapshot {
        VehicleSnapshot::new(
            "truck-7",
            json!({"detection": {"face_detection": {"status": status}}}),
        )
    }

    #[tokio::test]
    async fn test_intruder_alert_links_latest_photo() {
        let alerts = AlertsConfig {
            face_handler_url: Some("http://face-handler.local:8000/".to_string()),
            ..AlertsConfig::default()
        };
        let (store, queue, push, ctx) = harness(alerts);
        seed_vehicle(&store).await;

        IntruderEvaluator
            .evaluate(&ctx, &snapshot_with_face_status(2))
            .await
            .unwrap();

        assert!(queue.published()[0].message.contains("unrecognized person"));
        assert_eq!(
            push.sent()[0].1.image_url.as_deref(),
            Some("http://face-handler.local:8000/truck-7/intruder_photo/latest.jpg")
        );
    }

    #[tokio::test]
    async fn test_no_face_handler_means_no_image() {
        let (store, _queue, push, ctx) = harness(AlertsConfig::default());
        seed_vehicle(&store).await;

        IntruderEvaluator
            .evaluate(&ctx, &snapshot_with_face_status(2))
            .await
            .unwrap();

        assert_eq!(push.sent().len(), 1);
        assert!(push.sent()[0].1.image_url.is_none());
    }

    #[tokio::test]
    async fn test_other_statuses_are_quiet() {
        let (store, queue, _push, ctx) = harness(AlertsConfig::default());
        seed_vehicle(&store).await;

        for status in [0, 1, 3] {
            IntruderEvaluator
                .evaluate(&ctx, &snapshot_with_face_status(status))
                .await
                .unwrap();
        }

        assert!(queue.published().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_settings_suppress_intruder_alert() {
        let (store, queue, _push, ctx) = harness(AlertsConfig::default());
        seed_vehicle(&store).await;
        store
            .update("settings/truck-7/radius", json!({"enabled": false}))
            .await
            .unwrap();

        IntruderEvaluator
            .evaluate(&ctx, &snapshot_with_face_status(2))
            .await
            .unwrap();

        assert!(queue.published().is_empty());
    }
}
