//! Shared geometry primitives for sensor readings and pose/obstacle payloads.
//!
//! Conventions:
//! - **Body frame**: right-hand, X = forward, Y = left, Z = up.
//! - **Local tangent frame**: ENU Cartesian anchored at the first RTK fix
//!   (see `crate::GnssFix` and the localization engine's anchor logic).

use serde::{Deserialize, Serialize};

/// 3D vector in meters (or m/s, depending on context).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }
}

/// Unit orientation quaternion, scalar-first (w, x, y, z).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Normalize in place; returns `false` and leaves `self` untouched if the
    /// norm is zero or non-finite.
    pub fn normalize(&mut self) -> bool {
        let n = self.norm();
        if !n.is_finite() || n < 1e-12 {
            return false;
        }
        self.w /= n;
        self.x /= n;
        self.y /= n;
        self.z /= n;
        true
    }

    /// Roll (rotation about the body X axis), radians.
    pub fn roll(&self) -> f64 {
        let sinr_cosp = 2.0 * (self.w * self.x + self.y * self.z);
        let cosr_cosp = 1.0 - 2.0 * (self.x * self.x + self.y * self.y);
        sinr_cosp.atan2(cosr_cosp)
    }

    /// Pitch (rotation about the body Y axis), radians.
    pub fn pitch(&self) -> f64 {
        let sinp = 2.0 * (self.w * self.y - self.z * self.x);
        if sinp.abs() >= 1.0 {
            std::f64::consts::FRAC_PI_2.copysign(sinp)
        } else {
            sinp.asin()
        }
    }

    /// Yaw (rotation about the body Z axis), radians.
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// Geodetic coordinate (WGS-84).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Earth radius used for the equirectangular local-frame projection (meters).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Project a geodetic point onto a local tangent plane anchored at `origin`,
/// per spec.md §4.3: `x = Δλ·R·cos(φ₀)`, `y = Δφ·R`.
pub fn geo_to_local(origin: GeoPoint, point: GeoPoint) -> (f64, f64) {
    let phi0 = origin.lat.to_radians();
    let dlat = (point.lat - origin.lat).to_radians();
    let dlon = (point.lon - origin.lon).to_radians();
    let x = dlon * EARTH_RADIUS_M * phi0.cos();
    let y = dlat * EARTH_RADIUS_M;
    (x, y)
}

/// Inverse of [`geo_to_local`]: recover a geodetic point from local-frame
/// offsets relative to `origin`.
pub fn local_to_geo(origin: GeoPoint, x: f64, y: f64) -> GeoPoint {
    let phi0 = origin.lat.to_radians();
    let dlat = y / EARTH_RADIUS_M;
    let dlon = x / (EARTH_RADIUS_M * phi0.cos());
    GeoPoint {
        lat: origin.lat + dlat.to_degrees(),
        lon: origin.lon + dlon.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn projection_round_trips_within_1mm_over_1km() {
        let origin = GeoPoint { lat: 40.7128, lon: -74.0060 };
        let target = GeoPoint { lat: 40.7218, lon: -74.0160 };
        let (x, y) = geo_to_local(origin, target);
        // roughly within a 1km range
        assert!(x.abs() < 1500.0 && y.abs() < 1500.0);
        let back = local_to_geo(origin, x, y);
        assert_abs_diff_eq!(back.lat, target.lat, epsilon = 1e-8);
        assert_abs_diff_eq!(back.lon, target.lon, epsilon = 1e-8);
    }

    #[test]
    fn quaternion_normalize_rejects_zero() {
        let mut q = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert!(!q.normalize());
    }

    #[test]
    fn quaternion_roll_30_degrees() {
        let half = (30f64.to_radians() / 2.0).sin();
        let q = Quaternion::new((30f64.to_radians() / 2.0).cos(), half, 0.0, 0.0);
        assert_abs_diff_eq!(q.roll().to_degrees(), 30.0, epsilon = 1e-6);
    }
}
