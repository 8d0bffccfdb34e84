//! Great-circle distance math for the geofence evaluator.

use crate::types::GeoPoint;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers, via the haversine
/// formula.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPoint::new(-6.175, 106.827);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_latitude() {
        // 1 degree of latitude is ~111.19 km on a 6371 km sphere.
        let origin = GeoPoint::new(0.0, 0.0);
        let north = GeoPoint::new(1.0, 0.0);
        let d = haversine_km(origin, north);
        assert!((d - 111.19).abs() / 111.19 < 0.01, "got {d}");
    }

    #[test]
    fn test_symmetry() {
        let a = GeoPoint::new(-6.2, 106.8);
        let b = GeoPoint::new(-6.9, 107.6);
        let ab = haversine_km(a, b);
        let ba = haversine_km(b, a);
        assert!((ab - ba).abs() < 1e-9);
        assert!(ab > 0.0);
    }
}
