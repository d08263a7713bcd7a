//! Time-of-flight rangefinder adapter, grounded in
//! `sensor_fusion/obstacle_detection.py`'s `_process_tof_sensors` (only
//! `range_status == 'valid'` readings feed obstacle detection; other
//! statuses are passed through unmodified rather than discarded, so the
//! supervisor can still see "too close"/"too far" state).

use sensor_types::{MountPose, ReadingHeader, RangeStatus, Timestamp, TofReading};

use crate::error::IngressError;
use crate::ingress::require_finite;

#[derive(Debug, Clone)]
pub struct RawTofFrame {
    pub sensor_id: String,
    pub port_or_bus_id: String,
    pub distance_mm: f64,
    pub range_status: RangeStatus,
    pub signal_strength: f64,
    pub mount: MountPose,
    pub downward: bool,
}

pub fn validate(frame: RawTofFrame, timestamp: Timestamp) -> Result<TofReading, IngressError> {
    let distance_mm = require_finite(frame.distance_mm, "distance_mm", &frame.sensor_id)?;
    if distance_mm < 0.0 {
        return Err(IngressError::OutOfRange(format!("{}: negative distance_mm", frame.sensor_id)));
    }
    let signal_strength = require_finite(frame.signal_strength, "signal_strength", &frame.sensor_id)?;

    let quality = if frame.range_status == RangeStatus::Valid { 1.0 } else { 0.0 };

    Ok(TofReading {
        header: ReadingHeader {
            timestamp,
            sensor_id: frame.sensor_id,
            quality,
            port_or_bus_id: frame.port_or_bus_id,
        },
        distance_mm,
        range_status: frame.range_status,
        signal_strength,
        mount: frame.mount,
        downward: frame.downward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sensor_types::Vec3;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    fn good_frame() -> RawTofFrame {
        RawTofFrame {
            sensor_id: "tof_front".into(),
            port_or_bus_id: "i2c-2".into(),
            distance_mm: 450.0,
            range_status: RangeStatus::Valid,
            signal_strength: 0.9,
            mount: MountPose { offset: Vec3::ZERO, axis: Vec3::new(1.0, 0.0, 0.0) },
            downward: false,
        }
    }

    #[test]
    fn valid_reading_has_full_quality() {
        let reading = validate(good_frame(), ts()).unwrap();
        assert_eq!(reading.header.quality, 1.0);
    }

    #[test]
    fn invalid_range_status_lowers_quality_not_rejected() {
        let mut frame = good_frame();
        frame.range_status = RangeStatus::TooFar;
        let reading = validate(frame, ts()).unwrap();
        assert_eq!(reading.header.quality, 0.0);
    }

    #[test]
    fn negative_distance_rejected() {
        let mut frame = good_frame();
        frame.distance_mm = -5.0;
        assert!(validate(frame, ts()).is_err());
    }
}
