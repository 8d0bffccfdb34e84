//! Per-vehicle settings and recipient resolution.
//!
//! Settings are loaded fresh on every evaluation. Nothing is cached: an
//! operator flipping `radius.enabled` takes effect on the next change event.

use std::sync::Arc;

use serde_json::Value;

use outrider_core::types::{Recipient, VehicleSettings};
use outrider_store::{paths, RealtimeStore};

use crate::error::Result;

/// Reads vehicle settings, chat recipients and the emergency contact.
#[derive(Clone)]
pub struct SettingsResolver {
    store: Arc<dyn RealtimeStore>,
}

impl SettingsResolver {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// The vehicle's settings record, or `None` when the vehicle was never
    /// configured. Missing sub-fields resolve to defaults, absence of the
    /// whole record does not.
    pub async fn vehicle_settings(&self, vehicle_id: &str) -> Result<Option<VehicleSettings>> {
        let raw = self.store.read(&paths::settings(vehicle_id)).await?;
        Ok(raw.map(|value| VehicleSettings::from_value(&value)))
    }

    /// Every chat recipient registered for the vehicle.
    ///
    /// The directory is keyed by contact id; records carry the vehicle link
    /// and a group flag. A missing or wrong-typed group flag reads as a
    /// direct (non-group) contact.
    pub async fn recipients(&self, vehicle_id: &str) -> Result<Vec<Recipient>> {
        let matches = self
            .store
            .query_by_child(paths::RECIPIENTS, paths::RECIPIENT_VEHICLE_KEY, vehicle_id)
            .await?;
        Ok(matches
            .into_iter()
            .map(|(contact_id, record)| {
                let is_group = record
                    .get("isGroup")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                Recipient::new(contact_id, is_group)
            })
            .collect())
    }

    /// The emergency contact number from the vehicle's settings, if one is
    /// configured.
    pub async fn emergency_number(&self, vehicle_id: &str) -> Result<Option<String>> {
        let value = self.store.read(&paths::emergency_number(vehicle_id)).await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }
}
