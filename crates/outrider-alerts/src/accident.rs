//! Accident evaluator.
//!
//! An accident report from the vehicle opens a confirmation window instead of
//! paging the emergency contact outright. The recipients get a confirmation
//! message with the abort instructions; [`EscalationTracker`] owns what
//! happens when the window closes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use outrider_core::log_alert_event;
use outrider_core::types::{AlertKind, VehicleSnapshot};
use outrider_dispatch::PushNote;

use crate::error::Result;
use crate::escalation::EscalationTracker;
use crate::evaluator::{AlertContext, Evaluator};

const ACCIDENT_IMAGE_URL: &str = "https://cdni.iconscout.com/illustration/premium/thumb/\
     ambulance-emergency-doctors-carried-lying-illness-woman-on-stretcher-illustration-\
     download-in-svg-png-gif-file-formats--doctor-specialist-service-medical-bag-pack-\
     healthcare-illustrations-8022584.png?f=webp";

pub struct AccidentEvaluator {
    escalation: Arc<EscalationTracker>,
}

impl AccidentEvaluator {
    pub fn new(escalation: Arc<EscalationTracker>) -> Self {
        Self { escalation }
    }
}

#[async_trait]
impl Evaluator for AccidentEvaluator {
    fn kind(&self) -> AlertKind {
        AlertKind::Accident
    }

    async fn evaluate(&self, ctx: &AlertContext, snapshot: &VehicleSnapshot) -> Result<()> {
        let vehicle_id = snapshot.vehicle_id();
        let Some(status) = snapshot.state_status() else {
            return Ok(());
        };
        if !status.eq_ignore_ascii_case("accident") {
            debug!(vehicle_id = %vehicle_id, status = status, "vehicle state is not alerting");
            return Ok(());
        }
        let Some(settings) = ctx.enabled_settings(vehicle_id).await? else {
            return Ok(());
        };
        log_alert_event!(vehicle_id, AlertKind::Accident, "accident reported");

        let recipients = ctx
            .recipients_or_warn(vehicle_id, AlertKind::Accident)
            .await?;
        if recipients.is_empty() {
            return Ok(());
        }
        if !ctx.cooldown_permits(vehicle_id, AlertKind::Accident, &settings) {
            return Ok(());
        }

        let delay_secs = ctx.alerts.accident_confirm_delay_secs;
        let message = confirm_message(vehicle_id, delay_secs);
        let note = PushNote::new(
            "Accident reported",
            format!("Vehicle {vehicle_id} reported an accident."),
        )
        .with_image(ACCIDENT_IMAGE_URL);
        ctx.dispatch_alert(vehicle_id, &recipients, &message, &note)
            .await;

        self.escalation
            .begin(vehicle_id, Duration::from_secs(delay_secs))
            .await?;
        Ok(())
    }
}

fn confirm_message(vehicle_id: &str, delay_secs: u64) -> String {
    format!(
        "Accident alert: vehicle {vehicle_id} reported an accident. \
         If this is a false alarm, reply /abort within {delay_secs} seconds. \
         Otherwise the emergency contact will be notified automatically."
    )
}
