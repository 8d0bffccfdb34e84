//! Geofence breach evaluator.
//!
//! Compares each location update against the vehicle's home point and radius.
//! On a breach it alerts the chat recipients and, when takeover is enabled,
//! switches the vehicle off remotely and says so in a follow-up message.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use outrider_core::config::AlertsConfig;
use outrider_core::geo::haversine_km;
use outrider_core::log_alert_event;
use outrider_core::types::{AlertKind, GeoPoint, VehicleSettings, VehicleSnapshot};
use outrider_dispatch::PushNote;
use outrider_store::paths;

use crate::error::Result;
use crate::evaluator::{cooldown_footer, AlertContext, Evaluator};

pub struct GeofenceEvaluator;

#[async_trait]
impl Evaluator for GeofenceEvaluator {
    fn kind(&self) -> AlertKind {
        AlertKind::Geofence
    }

    async fn evaluate(&self, ctx: &AlertContext, snapshot: &VehicleSnapshot) -> Result<()> {
        let vehicle_id = snapshot.vehicle_id();
        let Some(location) = snapshot.location() else {
            debug!(vehicle_id = %vehicle_id, "no usable location in record");
            return Ok(());
        };
        let Some(settings) = ctx.enabled_settings(vehicle_id).await? else {
            return Ok(());
        };

        let distance_km = haversine_km(location, settings.home);
        debug!(vehicle_id = %vehicle_id, distance_km = distance_km, "distance from home");
        if distance_km <= settings.radius_km {
            return Ok(());
        }
        log_alert_event!(
            vehicle_id,
            AlertKind::Geofence,
            "radius exceeded",
            distance_km = distance_km,
            radius_km = settings.radius_km
        );

        let recipients = ctx
            .recipients_or_warn(vehicle_id, AlertKind::Geofence)
            .await?;
        if recipients.is_empty() {
            return Ok(());
        }
        if !ctx.cooldown_permits(vehicle_id, AlertKind::Geofence, &settings) {
            return Ok(());
        }

        let message = breach_message(vehicle_id, distance_km, &settings);
        let note = breach_note(vehicle_id, distance_km, location, &ctx.alerts);
        ctx.dispatch_alert(vehicle_id, &recipients, &message, &note)
            .await;

        if settings.takeover {
            info!(vehicle_id = %vehicle_id, "takeover enabled, switching vehicle off");
            ctx.store
                .update(&paths::master_switch(vehicle_id), json!({"value": false}))
                .await?;
            let takeover = takeover_message(vehicle_id);
            for recipient in &recipients {
                ctx.dispatcher.send_chat(vehicle_id, recipient, &takeover).await;
            }
            log_alert_event!(vehicle_id, AlertKind::Geofence, "vehicle switched off by takeover");
        }
        Ok(())
    }
}

fn breach_message(vehicle_id: &str, distance_km: f64, settings: &VehicleSettings) -> String {
    format!(
        "Geofence alert: vehicle {vehicle_id} is {distance_km:.2} km from its home point, \
         outside the allowed {radius} km radius.\n\n{footer}",
        radius = settings.radius_km,
        footer = cooldown_footer(settings.notify_interval_min),
    )
}

fn takeover_message(vehicle_id: &str) -> String {
    format!(
        "Security mode: vehicle {vehicle_id} was switched off automatically \
         after leaving its allowed radius."
    )
}

fn breach_note(
    vehicle_id: &str,
    distance_km: f64,
    location: GeoPoint,
    alerts: &AlertsConfig,
) -> PushNote {
    let note = PushNote::new(
        "Geofence alert",
        format!("Vehicle {vehicle_id} is {distance_km:.2} km from its home point."),
    );
    match static_map_url(alerts, location) {
        Some(url) => note.with_image(url),
        None => note,
    }
}

/// Static map image of the breach location. `None` when no map provider or
/// no API key is configured; the alert still fires without an image.
fn static_map_url(alerts: &AlertsConfig, location: GeoPoint) -> Option<String> {
    let map = alerts.static_map.as_ref()?;
    let api_key = map.api_key()?;
    Some(format!(
        "{base}?style=osm-bright&width=600&height=400&center=lonlat:{lng},{lat}\
         &zoom=13&marker=lonlat:{lng},{lat};type:material;color:%23ff3421&apiKey={key}",
        base = map.base_url.trim_end_matches('/'),
        lat = location.lat,
        lng = location.lng,
        key = api_key,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::RateLimiter;
    use crate::settings::SettingsResolver;
    use outrider_core::config::StaticMapConfig;
    use outrider_dispatch::{Dispatcher, MockPush, MockQueue};
    use outrider_store::{MemoryStore, RealtimeStore};
    use std::sync::Arc;

    fn harness() -> (Arc<MemoryStore>, Arc<MockQueue>, Arc<MockPush>, AlertContext) {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MockQueue::new());
        let push = Arc::new(MockPush::new());
        let ctx = AlertContext {
            store: store.clone(),
            dispatcher: Arc::new(Dispatcher::new(store.clone(), queue.clone(), push.clone())),
            settings: SettingsResolver::new(store.clone()),
            limiter: Arc::new(RateLimiter::with_system_clock()),
            alerts: AlertsConfig::default(),
        };
        (store, queue, push, ctx)
    }

    async fn seed_breach_scenario(store: &MemoryStore, takeover: bool) {
        store
            .set(
                "settings/truck-7",
                json!({
                    "radius": {"value": 5.0, "enabled": true, "lat": 0.0, "lng": 0.0, "takeover": takeover},
                    "notification_interval": 30,
                }),
            )
            .await
            .unwrap();
        store
            .set(
                "wausers",
                json!({"628111@g.us": {"vehicleId": "truck-7", "isGroup": true}}),
            )
            .await
            .unwrap();
        store
            .set(
                "settings/truck-7/fcm_token",
                json!({"k1": {"token": "tok-a", "updatedAt": 1}}),
            )
            .await
            .unwrap();
    }

    /// About 10 km north of the origin.
    fn breach_snapshot() -> VehicleSnapshot {
        VehicleSnapshot::new("truck-7", json!({"location": {"lat": 0.09, "lng": 0.0}}))
    }

    #[tokio::test]
    async fn test_breach_dispatches_chat_and_push() {
        let (store, queue, push, ctx) = harness();
        seed_breach_scenario(&store, false).await;

        GeofenceEvaluator
            .evaluate(&ctx, &breach_snapshot())
            .await
            .unwrap();

        let published = queue.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].number, "628111@g.us");
        assert!(published[0].is_group);
        assert!(published[0].message.contains("10.0"));
        assert!(published[0].message.contains("5 km"));

        let sent = push.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.title, "Geofence alert");
    }

    #[tokio::test]
    async fn test_disabled_settings_suppresses_everything() {
        let (store, queue, push, ctx) = harness();
        seed_breach_scenario(&store, false).await;
        store
            .update("settings/truck-7/radius", json!({"enabled": false}))
            .await
            .unwrap();

        GeofenceEvaluator
            .evaluate(&ctx, &breach_snapshot())
            .await
            .unwrap();

        assert!(queue.published().is_empty());
        assert!(push.sent().is_empty());
    }

    #[tokio::test]
    async fn test_inside_radius_is_quiet() {
        let (store, queue, _push, ctx) = harness();
        seed_breach_scenario(&store, false).await;

        let nearby = VehicleSnapshot::new("truck-7", json!({"location": {"lat": 0.01, "lng": 0.0}}));
        GeofenceEvaluator.evaluate(&ctx, &nearby).await.unwrap();

        assert!(queue.published().is_empty());
    }

    #[tokio::test]
    async fn test_takeover_switches_vehicle_off_and_announces_it() {
        let (store, queue, _push, ctx) = harness();
        seed_breach_scenario(&store, true).await;
        store
            .set("vehicle/truck-7", json!({"master_switch": {"value": true}}))
            .await
            .unwrap();

        GeofenceEvaluator
            .evaluate(&ctx, &breach_snapshot())
            .await
            .unwrap();

        let master_switch = store
            .read("vehicle/truck-7/master_switch/value")
            .await
            .unwrap();
        assert_eq!(master_switch, Some(json!(false)));

        let published = queue.published();
        assert_eq!(published.len(), 2);
        assert!(published[1].message.contains("switched off"));
    }

    #[tokio::test]
    async fn test_second_evaluation_in_window_is_suppressed() {
        let (store, queue, _push, ctx) = harness();
        seed_breach_scenario(&store, false).await;

        GeofenceEvaluator
            .evaluate(&ctx, &breach_snapshot())
            .await
            .unwrap();
        GeofenceEvaluator
            .evaluate(&ctx, &breach_snapshot())
            .await
            .unwrap();

        assert_eq!(queue.published().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_recipient_skips_without_consuming_cooldown() {
        let (store, queue, _push, ctx) = harness();
        seed_breach_scenario(&store, false).await;
        store.delete("wausers").await.unwrap();

        GeofenceEvaluator
            .evaluate(&ctx, &breach_snapshot())
            .await
            .unwrap();
        assert!(queue.published().is_empty());

        // Recipient registered afterwards: the first real firing must not be
        // blocked by the earlier skipped evaluation.
        store
            .set(
                "wausers",
                json!({"628111@g.us": {"vehicleId": "truck-7", "isGroup": true}}),
            )
            .await
            .unwrap();
        GeofenceEvaluator
            .evaluate(&ctx, &breach_snapshot())
            .await
            .unwrap();
        assert_eq!(queue.published().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_location_is_no_trigger() {
        let (store, queue, _push, ctx) = harness();
        seed_breach_scenario(&store, false).await;

        let broken = VehicleSnapshot::new("truck-7", json!({"location": {"lat": "x", "lng": 0.0}}));
        GeofenceEvaluator.evaluate(&ctx, &broken).await.unwrap();

        assert!(queue.published().is_empty());
    }

    #[test]
    fn test_static_map_url_needs_configured_key() {
        let alerts = AlertsConfig {
            static_map: Some(StaticMapConfig {
                base_url: "https://maps.geoapify.com/v1/staticmap".to_string(),
                api_key_env: "OUTRIDER_MAP_KEY_GEOFENCE_TEST".to_string(),
            }),
            ..AlertsConfig::default()
        };
        let point = GeoPoint::new(-6.2, 106.8);

        assert!(static_map_url(&alerts, point).is_none());

        // SAFETY: variable name is unique to this test, nothing reads it
        // concurrently.
        unsafe { std::env::set_var("OUTRIDER_MAP_KEY_GEOFENCE_TEST", "map-key") };
        let url = static_map_url(&alerts, point).unwrap();
        assert!(url.contains("lonlat:106.8,-6.2"));
        assert!(url.contains("apiKey=map-key"));
    }

    #[test]
    fn test_breach_message_rounds_distance() {
        let settings = VehicleSettings {
            radius_km: 5.0,
            enabled: true,
            home: GeoPoint::default(),
            takeover: false,
            notify_interval_min: 10,
        };
        let message = breach_message("truck-7", 10.00724, &settings);
        assert!(message.contains("10.01 km"));
        assert!(message.contains("after 10 min"));
    }
}
