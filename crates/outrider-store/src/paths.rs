//! Well-known store paths.
//!
//! The fleet backend lays its data out as a handful of top-level collections
//! keyed by vehicle id. Every path the alert pipeline touches is built here so
//! the layout lives in one place.

/// Collection of vehicle state documents, keyed by vehicle id.
pub const VEHICLES: &str = "vehicle";

/// Collection of chat recipients. Each record carries a `vehicleId` field
/// linking it to the vehicle it should be notified about.
pub const RECIPIENTS: &str = "wausers";

/// Field on recipient records used to look them up by vehicle.
pub const RECIPIENT_VEHICLE_KEY: &str = "vehicleId";

/// Collection of pending accident confirmation records.
pub const INCIDENTS: &str = "incidents";

/// Per-vehicle alert settings document.
pub fn settings(vehicle_id: &str) -> String {
    format!("settings/{vehicle_id}")
}

/// Emergency contact number inside a vehicle's settings.
pub fn emergency_number(vehicle_id: &str) -> String {
    format!("settings/{vehicle_id}/emergency_number")
}

/// Push token registry inside a vehicle's settings. The node is a map of
/// push-key to `{ token, updatedAt }` records.
pub fn fcm_tokens(vehicle_id: &str) -> String {
    format!("settings/{vehicle_id}/fcm_token")
}

/// Pending accident record for a vehicle.
pub fn incident(vehicle_id: &str) -> String {
    format!("incidents/{vehicle_id}")
}

/// Remote engine cut-off switch on the vehicle document itself.
pub fn master_switch(vehicle_id: &str) -> String {
    format!("vehicle/{vehicle_id}/master_switch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_vehicle_paths() {
        assert_eq!(settings("truck-7"), "settings/truck-7");
        assert_eq!(
            emergency_number("truck-7"),
            "settings/truck-7/emergency_number"
        );
        assert_eq!(fcm_tokens("truck-7"), "settings/truck-7/fcm_token");
        assert_eq!(incident("truck-7"), "incidents/truck-7");
        assert_eq!(master_switch("truck-7"), "vehicle/truck-7/master_switch");
    }
}
