//! Shared type definitions used across Outrider crates.
//!
//! This module provides the vocabulary the alerting pipeline speaks: alert
//! kinds, the tolerant view over raw vehicle telemetry, resolved per-vehicle
//! settings, and notification recipients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique identifier for a vehicle.
pub type VehicleId = String;

/// The alert kinds evaluated by the pipeline.
///
/// Each kind has its own evaluator and its own cooldown dimension: the rate
/// limiter keys on (vehicle, kind), so a geofence alert never consumes the
/// accident cooldown and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Vehicle moved outside its configured home radius
    Geofence,
    /// Driver yawning or sleepy (camera detection)
    Drowsiness,
    /// Unrecognized person at the vehicle
    Intruder,
    /// Crash signature in the motion state
    Accident,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geofence => write!(f, "geofence"),
            Self::Drowsiness => write!(f, "drowsiness"),
            Self::Intruder => write!(f, "intruder"),
            Self::Accident => write!(f, "accident"),
        }
    }
}

/// A geographic coordinate pair (decimal degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Tolerant view over one vehicle's raw telemetry document.
///
/// The telemetry tree is written by an external bridge and carries no schema
/// guarantees, so every accessor returns `None` for an absent or wrong-typed
/// sub-field. A malformed record is "no trigger", never an error.
#[derive(Debug, Clone)]
pub struct VehicleSnapshot {
    vehicle_id: VehicleId,
    value: Value,
}

impl VehicleSnapshot {
    pub fn new(vehicle_id: impl Into<VehicleId>, value: Value) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            value,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Current position from `location.{lat,lng}`.
    ///
    /// Requires both coordinates to be numbers; anything else reads as absent.
    pub fn location(&self) -> Option<GeoPoint> {
        let location = self.value.get("location")?;
        let lat = location.get("lat")?.as_f64()?;
        let lng = location.get("lng")?.as_f64()?;
        Some(GeoPoint::new(lat, lng))
    }

    /// Drowsiness status code from `detection.drowsiness.status_code`.
    ///
    /// 1 = yawning, 2 = sleepy; 0 and unknown codes mean no action.
    /// Non-integer values read as absent.
    pub fn drowsiness_status(&self) -> Option<i64> {
        self.value
            .pointer("/detection/drowsiness/status_code")?
            .as_i64()
    }

    /// Face-detection status from `detection.face_detection.status`.
    ///
    /// 2 = unrecognized person present.
    pub fn face_status(&self) -> Option<i64> {
        self.value
            .pointer("/detection/face_detection/status")?
            .as_i64()
    }

    /// Motion state from `state.status` (e.g. "accident").
    pub fn state_status(&self) -> Option<&str> {
        self.value.pointer("/state/status")?.as_str()
    }
}

/// Per-vehicle alerting settings, resolved from the raw settings document
/// with field-wise defaults.
///
/// An absent settings record is a valid state (vehicle never configured) and
/// is represented as `None` at the resolver level, not by this type.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSettings {
    /// Geofence radius threshold in kilometers
    pub radius_km: f64,
    /// Master gate for all alerting on this vehicle
    pub enabled: bool,
    /// Home point the geofence is measured from
    pub home: GeoPoint,
    /// Auto-disable the vehicle on a geofence breach
    pub takeover: bool,
    /// Cooldown between notifications of one kind, in minutes
    pub notify_interval_min: u64,
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            radius_km: 0.0,
            enabled: false,
            home: GeoPoint::default(),
            takeover: false,
            notify_interval_min: 30,
        }
    }
}

impl VehicleSettings {
    /// Resolve settings from the raw document, applying defaults for every
    /// missing or wrong-typed sub-field.
    ///
    /// Layout: `radius.{value,enabled,lat,lng,takeover}` plus a top-level
    /// `notification_interval` in minutes.
    pub fn from_value(raw: &Value) -> Self {
        let radius = raw.get("radius");
        let field = |name: &str| radius.and_then(|r| r.get(name));

        Self {
            radius_km: field("value").and_then(Value::as_f64).unwrap_or(0.0),
            enabled: field("enabled").and_then(Value::as_bool).unwrap_or(false),
            home: GeoPoint::new(
                field("lat").and_then(Value::as_f64).unwrap_or(0.0),
                field("lng").and_then(Value::as_f64).unwrap_or(0.0),
            ),
            takeover: field("takeover").and_then(Value::as_bool).unwrap_or(false),
            notify_interval_min: raw
                .get("notification_interval")
                .and_then(Value::as_u64)
                .unwrap_or(30),
        }
    }
}

/// A chat notification recipient resolved from the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Contact identifier (directory record key)
    pub contact_id: String,
    /// Whether the contact is a group conversation
    pub is_group: bool,
}

impl Recipient {
    pub fn new(contact_id: impl Into<String>, is_group: bool) -> Self {
        Self {
            contact_id: contact_id.into(),
            is_group,
        }
    }
}
