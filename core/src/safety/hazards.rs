//! Per-axis hazard checks, grounded in `safety/hazard_detector.py`'s
//! threat-pattern table and `maintenance_safety.py`'s environmental
//! gating. Each check is pure: given the latest readings and thresholds,
//! decide whether the axis is safe and produce an alert if not.

use sensor_types::{AlertLevel, HazardAlert, MeasuredQuantities, Quaternion, RecommendedAction, SafetyAxisFlags, Timestamp};

use crate::config::SafetyConfig;

fn alert(kind: &str, level: AlertLevel, description: String, action: RecommendedAction, now: Timestamp, id_suffix: &str) -> HazardAlert {
    HazardAlert {
        alert_id: format!("{kind}_{}", id_suffix),
        kind: kind.to_string(),
        level,
        t: now,
        description,
        location: None,
        sensor_context: Default::default(),
        recommended_action: action,
        immediate_response_required: matches!(level, AlertLevel::Critical),
    }
}

pub struct HazardAssessment {
    pub flags: SafetyAxisFlags,
    pub measured: MeasuredQuantities,
    pub alerts: Vec<HazardAlert>,
}

pub fn check_tilt(orientation: &Quaternion, config: &SafetyConfig, now: Timestamp, id_suffix: &str) -> (bool, f64, Option<HazardAlert>) {
    let tilt_deg = orientation.roll().abs().max(orientation.pitch().abs()).to_degrees();
    let level = if tilt_deg >= config.tilt.critical_deg {
        Some(AlertLevel::Critical)
    } else if tilt_deg >= config.tilt.high_deg {
        Some(AlertLevel::High)
    } else if tilt_deg >= config.tilt.medium_deg {
        Some(AlertLevel::Medium)
    } else {
        None
    };
    match level {
        None => (true, tilt_deg, None),
        Some(level) => {
            let action = if level == AlertLevel::Critical { RecommendedAction::EmergencyStop } else { RecommendedAction::Stop };
            (
                false,
                tilt_deg,
                Some(alert("tilt", level, format!("chassis tilt {tilt_deg:.1} degrees"), action, now, id_suffix)),
            )
        }
    }
}

pub fn check_drop(clearance_m: Option<f64>, config: &SafetyConfig, now: Timestamp, id_suffix: &str) -> (bool, f64, Option<HazardAlert>) {
    let clearance_m = clearance_m.unwrap_or(config.drop.default_clearance_m);
    let critical_m = config.drop.critical_cm / 100.0;
    if clearance_m <= critical_m {
        (
            false,
            clearance_m,
            Some(alert(
                "drop",
                AlertLevel::Critical,
                format!("ground clearance {clearance_m:.3}m below {critical_m:.3}m"),
                RecommendedAction::EmergencyStop,
                now,
                id_suffix,
            )),
        )
    } else {
        (true, clearance_m, None)
    }
}

pub fn check_collision(jerk_g: f64, config: &SafetyConfig, now: Timestamp, id_suffix: &str) -> (bool, Option<HazardAlert>) {
    if jerk_g >= config.collision.critical_g {
        (
            false,
            Some(alert(
                "collision",
                AlertLevel::Critical,
                format!("impact {jerk_g:.2}g exceeds {:.2}g", config.collision.critical_g),
                RecommendedAction::EmergencyStop,
                now,
                id_suffix,
            )),
        )
    } else {
        (true, None)
    }
}

pub fn check_proximity(nearest_obstacle_m: f64, config: &SafetyConfig, now: Timestamp, id_suffix: &str) -> (bool, Option<HazardAlert>) {
    if nearest_obstacle_m <= config.proximity.critical_m {
        (
            false,
            Some(alert(
                "proximity",
                AlertLevel::Critical,
                format!("obstacle at {nearest_obstacle_m:.2}m"),
                RecommendedAction::EmergencyStop,
                now,
                id_suffix,
            )),
        )
    } else if nearest_obstacle_m <= config.proximity.high_m {
        (
            false,
            Some(alert(
                "proximity",
                AlertLevel::High,
                format!("obstacle at {nearest_obstacle_m:.2}m"),
                RecommendedAction::Stop,
                now,
                id_suffix,
            )),
        )
    } else {
        (true, None)
    }
}

/// `signed_distance_m` is negative outside the polygon. Inside the margin
/// is safe, outside the margin but still inside the polygon is medium,
/// outside the polygon is high, and more than `critical_outside_m` past
/// the boundary is critical.
pub fn check_boundary(safe: bool, signed_distance_m: f64, config: &SafetyConfig, now: Timestamp, id_suffix: &str) -> (bool, Option<HazardAlert>) {
    let boundary = &config.boundary;
    if signed_distance_m <= -boundary.critical_outside_m {
        return (
            false,
            Some(alert(
                "boundary",
                AlertLevel::Critical,
                format!("{:.1}m past the boundary", -signed_distance_m),
                RecommendedAction::EmergencyStop,
                now,
                id_suffix,
            )),
        );
    }
    if signed_distance_m < 0.0 {
        return (
            false,
            Some(alert(
                "boundary",
                AlertLevel::High,
                format!("{:.1}m outside the boundary", -signed_distance_m),
                RecommendedAction::Stop,
                now,
                id_suffix,
            )),
        );
    }
    if signed_distance_m < boundary.margin_m {
        return (
            safe,
            Some(alert(
                "boundary",
                AlertLevel::Medium,
                format!("{:.1}m inside boundary margin", signed_distance_m),
                RecommendedAction::Caution,
                now,
                id_suffix,
            )),
        );
    }
    (safe, None)
}

pub fn check_weather(
    temperature_c: f64,
    humidity_pct: f64,
    rain_signal: Option<bool>,
    config: &SafetyConfig,
    now: Timestamp,
    id_suffix: &str,
) -> (bool, Option<HazardAlert>) {
    let is_raining = rain_signal.unwrap_or(humidity_pct > config.wet.humidity_pct);
    if is_raining {
        return (
            false,
            Some(alert("weather", AlertLevel::Medium, "rain detected, mowing unsafe".into(), RecommendedAction::Stop, now, id_suffix)),
        );
    }
    if temperature_c < config.temperature.min_c || temperature_c > config.temperature.max_c {
        return (
            false,
            Some(alert(
                "weather",
                AlertLevel::Medium,
                format!("temperature {temperature_c:.1}C outside operating range"),
                RecommendedAction::Stop,
                now,
                id_suffix,
            )),
        );
    }
    (true, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    #[test]
    fn level_tilt_is_safe() {
        let config = SafetyConfig::default();
        let (safe, _, alert) = check_tilt(&Quaternion::default(), &config, ts(), "1");
        assert!(safe);
        assert!(alert.is_none());
    }

    #[test]
    fn steep_tilt_triggers_critical() {
        let config = SafetyConfig::default();
        let half = (30f64.to_radians() / 2.0).sin();
        let q = Quaternion::new((30f64.to_radians() / 2.0).cos(), half, 0.0, 0.0);
        let (safe, _, alert) = check_tilt(&q, &config, ts(), "1");
        assert!(!safe);
        assert_eq!(alert.unwrap().level, AlertLevel::Critical);
    }

    #[test]
    fn shallow_clearance_triggers_drop_alert() {
        let config = SafetyConfig::default();
        let (safe, clearance, alert) = check_drop(Some(0.02), &config, ts(), "1");
        assert!(!safe);
        assert!((clearance - 0.02).abs() < 1e-9);
        assert!(alert.is_some());
    }

    #[test]
    fn far_boundary_exit_is_critical() {
        let config = SafetyConfig::default();
        let (safe, alert) = check_boundary(false, -167.0, &config, ts(), "1");
        assert!(!safe);
        assert_eq!(alert.unwrap().level, AlertLevel::Critical);
    }

    #[test]
    fn just_outside_boundary_is_high() {
        let config = SafetyConfig::default();
        let (safe, alert) = check_boundary(false, -0.5, &config, ts(), "1");
        assert!(!safe);
        assert_eq!(alert.unwrap().level, AlertLevel::High);
    }

    #[test]
    fn inside_margin_is_medium_but_still_safe() {
        let config = SafetyConfig::default();
        let (safe, alert) = check_boundary(true, 0.3, &config, ts(), "1");
        assert!(safe);
        assert_eq!(alert.unwrap().level, AlertLevel::Medium);
    }

    #[test]
    fn well_inside_boundary_has_no_alert() {
        let config = SafetyConfig::default();
        let (safe, alert) = check_boundary(true, f64::INFINITY, &config, ts(), "1");
        assert!(safe);
        assert!(alert.is_none());
    }
}
