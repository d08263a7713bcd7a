//! IMU adapter. A quaternion that fails to normalize (zero or non-finite
//! norm) is rejected outright rather than silently passed through — a
//! corrupt orientation must never reach the localization filter.

use sensor_types::{CalibrationScore, ImuReading, Quaternion, ReadingHeader, Timestamp, Vec3};

use crate::error::IngressError;
use crate::ingress::{require_finite, require_range};

#[derive(Debug, Clone)]
pub struct RawImuFrame {
    pub sensor_id: String,
    pub port_or_bus_id: String,
    pub quaternion: Quaternion,
    pub linear_acceleration: Vec3,
    pub angular_velocity: Vec3,
    pub magnetic_field: Option<Vec3>,
    pub calibration: CalibrationScore,
}

pub fn validate(frame: RawImuFrame, timestamp: Timestamp) -> Result<ImuReading, IngressError> {
    let mut quaternion = frame.quaternion;
    if !quaternion.is_finite() {
        return Err(IngressError::NonFinite(format!("{}.quaternion", frame.sensor_id)));
    }
    if !quaternion.normalize() {
        return Err(IngressError::MalformedFrame(format!("{}: zero-norm quaternion", frame.sensor_id)));
    }

    let _ = require_finite(frame.linear_acceleration.x, "linear_acceleration.x", &frame.sensor_id)?;
    let _ = require_finite(frame.linear_acceleration.y, "linear_acceleration.y", &frame.sensor_id)?;
    let _ = require_finite(frame.linear_acceleration.z, "linear_acceleration.z", &frame.sensor_id)?;
    let accel_norm = frame.linear_acceleration.norm();
    require_range(accel_norm, "linear_acceleration.norm", &frame.sensor_id, 0.0, 160.0)?;

    let _ = require_finite(frame.angular_velocity.x, "angular_velocity.x", &frame.sensor_id)?;
    let _ = require_finite(frame.angular_velocity.y, "angular_velocity.y", &frame.sensor_id)?;
    let _ = require_finite(frame.angular_velocity.z, "angular_velocity.z", &frame.sensor_id)?;

    let quality = match frame.calibration {
        CalibrationScore::High => 1.0,
        CalibrationScore::Medium => 0.66,
        CalibrationScore::Low => 0.33,
        CalibrationScore::Uncalibrated => 0.0,
    };

    Ok(ImuReading {
        header: ReadingHeader {
            timestamp,
            sensor_id: frame.sensor_id,
            quality,
            port_or_bus_id: frame.port_or_bus_id,
        },
        quaternion,
        linear_acceleration: frame.linear_acceleration,
        angular_velocity: frame.angular_velocity,
        magnetic_field: frame.magnetic_field,
        calibration: frame.calibration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    fn good_frame() -> RawImuFrame {
        RawImuFrame {
            sensor_id: "imu0".into(),
            port_or_bus_id: "i2c-1".into(),
            quaternion: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            linear_acceleration: Vec3::new(0.0, 0.0, 9.81),
            angular_velocity: Vec3::new(0.0, 0.0, 0.0),
            magnetic_field: None,
            calibration: CalibrationScore::High,
        }
    }

    #[test]
    fn valid_frame_normalizes_quaternion() {
        let mut frame = good_frame();
        frame.quaternion = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        let reading = validate(frame, ts()).unwrap();
        assert!((reading.quaternion.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_quaternion_rejected() {
        let mut frame = good_frame();
        frame.quaternion = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert!(validate(frame, ts()).is_err());
    }

    #[test]
    fn unreasonable_acceleration_rejected() {
        let mut frame = good_frame();
        frame.linear_acceleration = Vec3::new(500.0, 0.0, 0.0);
        assert!(validate(frame, ts()).is_err());
    }
}
