//! Slope and weather gating: session-level lockouts that block mowing
//! rather than per-tick hazard alerts, grounded in
//! `safety/safety_service.py`'s slope-analysis handling and
//! `backend/src/services/weather_service.py`'s mow-safety gate.

use sensor_types::{LockoutKind, LockoutSeverity, MaintenanceLockout, Quaternion, Timestamp};

use crate::config::SlopeConfig;

pub fn slope_deg(orientation: &Quaternion) -> f64 {
    orientation.roll().abs().max(orientation.pitch().abs()).to_degrees()
}

pub fn assess_slope(orientation: &Quaternion, config: &SlopeConfig, now: Timestamp) -> Option<MaintenanceLockout> {
    let deg = slope_deg(orientation);
    if deg > config.unsafe_deg {
        Some(MaintenanceLockout {
            lockout_id: format!("slope_{}", now.monotonic_ns),
            kind: LockoutKind::SlopeSafety,
            severity: LockoutSeverity::Blocking,
            reason: format!("slope {deg:.1} degrees exceeds safe limit {:.1}", config.unsafe_deg),
            affected_subsystems: vec!["drive".to_string(), "blade".to_string()],
            created_at: now,
            expires_at: None,
            override_level: Some("technician".to_string()),
        })
    } else if deg > config.caution_deg {
        Some(MaintenanceLockout {
            lockout_id: format!("slope_{}", now.monotonic_ns),
            kind: LockoutKind::SlopeSafety,
            severity: LockoutSeverity::Advisory,
            reason: format!("slope {deg:.1} degrees exceeds caution threshold {:.1}", config.caution_deg),
            affected_subsystems: vec!["blade".to_string()],
            created_at: now,
            expires_at: None,
            override_level: None,
        })
    } else {
        None
    }
}

pub fn assess_weather(is_raining: bool, temperature_c: f64, min_c: f64, max_c: f64, now: Timestamp) -> Option<MaintenanceLockout> {
    if is_raining {
        return Some(MaintenanceLockout {
            lockout_id: format!("weather_rain_{}", now.monotonic_ns),
            kind: LockoutKind::WeatherSafety,
            severity: LockoutSeverity::Blocking,
            reason: "rain detected, mowing unsafe".to_string(),
            affected_subsystems: vec!["drive".to_string(), "blade".to_string()],
            created_at: now,
            expires_at: None,
            override_level: None,
        });
    }
    if temperature_c < min_c || temperature_c > max_c {
        return Some(MaintenanceLockout {
            lockout_id: format!("weather_temp_{}", now.monotonic_ns),
            kind: LockoutKind::WeatherSafety,
            severity: LockoutSeverity::Blocking,
            reason: format!("temperature {temperature_c:.1}C outside {min_c:.1}-{max_c:.1}C operating range"),
            affected_subsystems: vec!["drive".to_string(), "blade".to_string()],
            created_at: now,
            expires_at: None,
            override_level: None,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    #[test]
    fn level_orientation_has_no_slope_lockout() {
        let config = SlopeConfig::default();
        assert!(assess_slope(&Quaternion::default(), &config, ts()).is_none());
    }

    #[test]
    fn rain_blocks_mowing() {
        assert!(assess_weather(true, 20.0, 5.0, 40.0, ts()).is_some());
    }

    #[test]
    fn cold_temperature_blocks_mowing() {
        let lockout = assess_weather(false, -5.0, 5.0, 40.0, ts()).unwrap();
        assert_eq!(lockout.severity, LockoutSeverity::Blocking);
    }
}
