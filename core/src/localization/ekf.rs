//! 13-state Extended Kalman Filter: `[x, y, z, vx, vy, vz, qw, qx, qy, qz,
//! wx, wy, wz]` in the local tangent frame, per spec.md §4.3. Grounded in
//! `sensor_fusion/localization.py`'s `KalmanState`/`_predict_state`/
//! `_update_with_gps`/`_update_with_imu`, translated from NumPy arrays to
//! `nalgebra` fixed-size matrices so the 13x13 covariance never touches
//! the heap on the prediction hot path (spec.md §9).

use nalgebra::{Matrix3, Matrix4, SMatrix, SVector, Vector3, Vector4};
use sensor_types::{Quaternion, Timestamp};

pub const STATE_DIM: usize = 13;

pub type StateVector = SVector<f64, STATE_DIM>;
pub type StateCovariance = SMatrix<f64, STATE_DIM, STATE_DIM>;

#[derive(Debug, Clone)]
pub struct ProcessNoise {
    pub position: f64,
    pub velocity: f64,
    pub orientation: f64,
    pub angular_velocity: f64,
}

impl Default for ProcessNoise {
    fn default() -> Self {
        Self { position: 0.01, velocity: 0.1, orientation: 0.01, angular_velocity: 0.1 }
    }
}

#[derive(Debug, Clone)]
pub struct EkfState {
    pub x: StateVector,
    pub p: StateCovariance,
    pub timestamp: Timestamp,
}

impl EkfState {
    /// Identity orientation, zero position/velocity, initial uncertainty
    /// matching the source's `_initialize_kalman_filter`.
    pub fn init(timestamp: Timestamp) -> Self {
        let mut x = StateVector::zeros();
        x[6] = 1.0; // qw
        let mut p = StateCovariance::identity();
        for i in 0..3 {
            p[(i, i)] = 1.0;
        }
        for i in 3..6 {
            p[(i, i)] = 0.1;
        }
        for i in 6..10 {
            p[(i, i)] = 0.1;
        }
        for i in 10..13 {
            p[(i, i)] = 0.1;
        }
        Self { x, p, timestamp }
    }

    pub fn position(&self) -> Vector3<f64> {
        self.x.fixed_rows::<3>(0).into()
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.x.fixed_rows::<3>(3).into()
    }

    pub fn orientation(&self) -> Quaternion {
        Quaternion::new(self.x[6], self.x[7], self.x[8], self.x[9])
    }

    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.x.fixed_rows::<3>(10).into()
    }

    pub fn position_covariance(&self) -> Matrix3<f64> {
        self.p.fixed_view::<3, 3>(0, 0).into()
    }

    /// Trace of the position covariance block; used to detect divergence.
    pub fn position_uncertainty_trace(&self) -> f64 {
        self.position_covariance().trace()
    }

    /// Constant-velocity prediction step, `F x` / `F P F^T + Q`.
    pub fn predict(&mut self, dt: f64, noise: &ProcessNoise) {
        if dt <= 0.0 {
            return;
        }
        let mut f = StateCovariance::identity();
        for i in 0..3 {
            f[(i, i + 3)] = dt;
        }

        let mut q = StateCovariance::zeros();
        for i in 0..3 {
            q[(i, i)] = noise.position * dt * dt;
        }
        for i in 3..6 {
            q[(i, i)] = noise.velocity * dt;
        }
        for i in 6..10 {
            q[(i, i)] = noise.orientation * dt;
        }
        for i in 10..13 {
            q[(i, i)] = noise.angular_velocity * dt;
        }

        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + q;
    }

    /// GPS/RTK position measurement update (observes state indices 0..3).
    pub fn update_position(&mut self, measured: Vector3<f64>, accuracy_m: f64, floor_noise_m: f64) {
        let mut h = SMatrix::<f64, 3, STATE_DIM>::zeros();
        for i in 0..3 {
            h[(i, i)] = 1.0;
        }
        let sigma = accuracy_m.max(floor_noise_m);
        let r = Matrix3::identity() * (sigma * sigma);

        let innovation = measured - h * self.x;
        let s = h * self.p * h.transpose() + r;
        let Some(s_inv) = s.try_inverse() else { return };
        let k = self.p * h.transpose() * s_inv;

        self.x += k * innovation;
        let i_kh = StateCovariance::identity() - k * h;
        self.p = i_kh * self.p;
    }

    /// IMU orientation measurement update (observes the quaternion block),
    /// followed by renormalization and a direct angular-velocity set —
    /// the source treats angular velocity as directly observed, not
    /// filtered, once an IMU sample is present.
    pub fn update_orientation(&mut self, measured: Quaternion, angular_velocity: Vector3<f64>, noise_rad: f64) {
        let mut h = SMatrix::<f64, 4, STATE_DIM>::zeros();
        for i in 0..4 {
            h[(i, i + 6)] = 1.0;
        }
        let z = Vector4::new(measured.w, measured.x, measured.y, measured.z);
        let r = Matrix4::identity() * (noise_rad * noise_rad);

        let innovation = z - h * self.x;
        let s = h * self.p * h.transpose() + r;
        let Some(s_inv) = s.try_inverse() else { return };
        let k = self.p * h.transpose() * s_inv;

        self.x += k * innovation;
        let i_kh = StateCovariance::identity() - k * h;
        self.p = i_kh * self.p;

        let norm = (self.x[6].powi(2) + self.x[7].powi(2) + self.x[8].powi(2) + self.x[9].powi(2)).sqrt();
        if norm > 1e-9 {
            for i in 6..10 {
                self.x[i] /= norm;
            }
        }
        for i in 0..3 {
            self.x[10 + i] = angular_velocity[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::Utc;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    #[test]
    fn predict_advances_position_by_velocity() {
        let mut state = EkfState::init(ts());
        state.x[3] = 1.0; // vx = 1 m/s
        state.predict(2.0, &ProcessNoise::default());
        assert_abs_diff_eq!(state.x[0], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn position_update_pulls_state_toward_measurement() {
        let mut state = EkfState::init(ts());
        state.update_position(Vector3::new(10.0, 0.0, 0.0), 0.02, 0.05);
        assert!(state.x[0] > 0.0 && state.x[0] <= 10.0);
    }

    #[test]
    fn orientation_update_keeps_quaternion_normalized() {
        let mut state = EkfState::init(ts());
        let tilted = Quaternion::new(0.9, 0.1, 0.0, 0.0);
        state.update_orientation(tilted, Vector3::zeros(), 0.01);
        let q = state.orientation();
        assert_abs_diff_eq!(q.norm(), 1.0, epsilon = 1e-6);
    }
}
