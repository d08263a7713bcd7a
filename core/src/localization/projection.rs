//! Local tangent-plane anchor management. The EKF state lives in local
//! ENU meters; the anchor is the first RTK fix received, per spec.md §4.3.
//! Before an anchor exists the filter runs in "awaiting anchor" mode and
//! position output is suppressed rather than reported at a bogus origin.

use nalgebra::Vector3;
use sensor_types::{geo_to_local, local_to_geo, GeoPoint};

#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    origin: GeoPoint,
    origin_altitude_m: f64,
}

impl Anchor {
    pub fn new(origin: GeoPoint, origin_altitude_m: f64) -> Self {
        Self { origin, origin_altitude_m }
    }

    pub fn to_local(&self, point: GeoPoint, altitude_m: f64) -> Vector3<f64> {
        let (x, y) = geo_to_local(self.origin, point);
        Vector3::new(x, y, altitude_m - self.origin_altitude_m)
    }

    pub fn to_geo(&self, local: Vector3<f64>) -> (GeoPoint, f64) {
        let point = local_to_geo(self.origin, local.x, local.y);
        (point, self.origin_altitude_m + local.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn round_trips_through_local_frame() {
        let origin = GeoPoint { lat: 39.0, lon: -104.9 };
        let anchor = Anchor::new(origin, 1700.0);
        let target = GeoPoint { lat: 39.0005, lon: -104.9005 };
        let local = anchor.to_local(target, 1702.0);
        let (back, alt) = anchor.to_geo(local);
        assert_abs_diff_eq!(back.lat, target.lat, epsilon = 1e-8);
        assert_abs_diff_eq!(back.lon, target.lon, epsilon = 1e-8);
        assert_abs_diff_eq!(alt, 1702.0, epsilon = 1e-9);
    }
}
