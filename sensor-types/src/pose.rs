//! `PoseEstimate` — spec.md §3. Owned exclusively by the localization
//! engine; shared with consumers as copy-on-publish snapshots.

use serde::{Deserialize, Serialize};

use crate::geometry::{GeoPoint, Quaternion, Vec3};
use crate::timestamp::Timestamp;

/// Flattened row-major 6×6 covariance over
/// `[x, y, z, roll, pitch, yaw]`.
pub type Covariance6 = [[f64; 6]; 6];

pub fn zero_covariance6() -> Covariance6 {
    [[0.0; 6]; 6]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub t: Timestamp,
    pub gps: GeoPoint,
    pub gps_altitude: f64,
    pub local: Vec3,
    pub quaternion: Quaternion,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub covariance: Covariance6,
    pub gps_accuracy_m: f64,
    pub imu_quality: f64,
    pub fusion_confidence: f64,
}

impl PoseEstimate {
    /// 1-σ position uncertainty: sqrt(trace of the 3×3 position submatrix).
    pub fn position_sigma_m(&self) -> f64 {
        let trace = self.covariance[0][0] + self.covariance[1][1] + self.covariance[2][2];
        trace.max(0.0).sqrt()
    }

    pub fn position_variance_trace(&self) -> f64 {
        self.covariance[0][0] + self.covariance[1][1] + self.covariance[2][2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_from_trace() {
        let mut cov = zero_covariance6();
        cov[0][0] = 0.01;
        cov[1][1] = 0.01;
        cov[2][2] = 0.02;
        let pose = PoseEstimate {
            t: Timestamp::new(0, chrono::Utc::now()),
            gps: GeoPoint::default(),
            gps_altitude: 0.0,
            local: Vec3::ZERO,
            quaternion: Quaternion::default(),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            covariance: cov,
            gps_accuracy_m: 0.05,
            imu_quality: 1.0,
            fusion_confidence: 0.9,
        };
        assert!((pose.position_sigma_m() - 0.2_f64.sqrt()).abs() < 1e-9);
    }
}
