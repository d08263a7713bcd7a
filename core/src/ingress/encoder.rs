//! Wheel-encoder / RoboHAT link status adapter. `link_alive = false`
//! passes validation — a dead encoder link is itself safety-relevant
//! state, reported rather than discarded (spec.md §3).

use sensor_types::{EncoderStatusReading, ReadingHeader, Timestamp};

use crate::error::IngressError;

#[derive(Debug, Clone)]
pub struct RawEncoderFrame {
    pub sensor_id: String,
    pub port_or_bus_id: String,
    pub rc_enabled: bool,
    pub steer_pwm_us: u16,
    pub throttle_pwm_us: u16,
    pub tick_count: i64,
    pub link_alive: bool,
}

pub fn validate(frame: RawEncoderFrame, timestamp: Timestamp) -> Result<EncoderStatusReading, IngressError> {
    const PWM_MIN_US: u16 = 900;
    const PWM_MAX_US: u16 = 2100;
    if !(PWM_MIN_US..=PWM_MAX_US).contains(&frame.steer_pwm_us) {
        return Err(IngressError::OutOfRange(format!("{}: steer_pwm_us out of range", frame.sensor_id)));
    }
    if !(PWM_MIN_US..=PWM_MAX_US).contains(&frame.throttle_pwm_us) {
        return Err(IngressError::OutOfRange(format!("{}: throttle_pwm_us out of range", frame.sensor_id)));
    }

    Ok(EncoderStatusReading {
        header: ReadingHeader {
            timestamp,
            sensor_id: frame.sensor_id,
            quality: if frame.link_alive { 1.0 } else { 0.0 },
            port_or_bus_id: frame.port_or_bus_id,
        },
        rc_enabled: frame.rc_enabled,
        steer_pwm_us: frame.steer_pwm_us,
        throttle_pwm_us: frame.throttle_pwm_us,
        tick_count: frame.tick_count,
        link_alive: frame.link_alive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn dead_link_still_validates() {
        let frame = RawEncoderFrame {
            sensor_id: "encoder0".into(),
            port_or_bus_id: "serial0".into(),
            rc_enabled: false,
            steer_pwm_us: 1500,
            throttle_pwm_us: 1500,
            tick_count: 0,
            link_alive: false,
        };
        let reading = validate(frame, Timestamp::new(0, Utc::now())).unwrap();
        assert_eq!(reading.header.quality, 0.0);
    }

    #[test]
    fn pwm_out_of_servo_range_rejected() {
        let frame = RawEncoderFrame {
            sensor_id: "encoder0".into(),
            port_or_bus_id: "serial0".into(),
            rc_enabled: true,
            steer_pwm_us: 100,
            throttle_pwm_us: 1500,
            tick_count: 0,
            link_alive: true,
        };
        assert!(validate(frame, Timestamp::new(0, Utc::now())).is_err());
    }
}
