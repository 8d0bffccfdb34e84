//! Driver drowsiness evaluator.
//!
//! The camera bridge classifies the driver into discrete status codes. Codes
//! 1 (frequent yawning) and 2 (falling asleep) alert; everything else is
//! normal driving.

use async_trait::async_trait;
use tracing::debug;

use outrider_core::log_alert_event;
use outrider_core::types::{AlertKind, VehicleSnapshot};
use outrider_dispatch::PushNote;

use crate::error::Result;
use crate::evaluator::{cooldown_footer, AlertContext, Evaluator};

const YAWNING_IMAGE_URL: &str =
    "https://thumb.ac-illust.com/0b/0bc27691456f9c8b97b5dd634b5dc8e6_t.jpeg";
const SLEEPY_IMAGE_URL: &str = "https://media.istockphoto.com/id/1068466754/vector/\
     sleepless-girl-suffers-from-insomnia.jpg\
     ?s=612x612&w=0&k=20&c=dXxtQfCFpo6f2AkR-551szCUbghVO3RueRF6RqFdtRM=";

/// Alerting drowsiness classifications, from the bridge's status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrowsinessLevel {
    Yawning,
    Sleepy,
}

impl DrowsinessLevel {
    fn from_status(status_code: i64) -> Option<Self> {
        match status_code {
            1 => Some(Self::Yawning),
            2 => Some(Self::Sleepy),
            _ => None,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Yawning => "is yawning frequently",
            Self::Sleepy => "appears to be falling asleep",
        }
    }

    fn image_url(self) -> &'static str {
        match self {
            Self::Yawning => YAWNING_IMAGE_URL,
            Self::Sleepy => SLEEPY_IMAGE_URL,
        }
    }
}

pub struct DrowsinessEvaluator;

#[async_trait]
impl Evaluator for DrowsinessEvaluator {
    fn kind(&self) -> AlertKind {
        AlertKind::Drowsiness
    }

    async fn evaluate(&self, ctx: &AlertContext, snapshot: &VehicleSnapshot) -> Result<()> {
        let vehicle_id = snapshot.vehicle_id();
        let Some(status_code) = snapshot.drowsiness_status() else {
            return Ok(());
        };
        let Some(level) = DrowsinessLevel::from_status(status_code) else {
            debug!(vehicle_id = %vehicle_id, status_code = status_code, "drowsiness status is not alerting");
            return Ok(());
        };
        let Some(settings) = ctx.enabled_settings(vehicle_id).await? else {
            return Ok(());
        };
        log_alert_event!(
            vehicle_id,
            AlertKind::Drowsiness,
            "drowsiness detected",
            status_code = status_code
        );

        let recipients = ctx
            .recipients_or_warn(vehicle_id, AlertKind::Drowsiness)
            .await?;
        if recipients.is_empty() {
            return Ok(());
        }
        if !ctx.cooldown_permits(vehicle_id, AlertKind::Drowsiness, &settings) {
            return Ok(());
        }

        let message = format!(
            "Drowsiness alert: the driver of vehicle {vehicle_id} {state}. \
             Please check on them.\n\n{footer}",
            state = level.describe(),
            footer = cooldown_footer(settings.notify_interval_min),
        );
        let note = PushNote::new(
            "Drowsiness alert",
            format!("The driver of vehicle {vehicle_id} {}.", level.describe()),
        )
        .with_image(level.image_url());
        ctx.dispatch_alert(vehicle_id, &recipients, &message, &note)
            .await;
        Ok(())
    }
}
