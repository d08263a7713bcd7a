//! `HazardAlert` / `SafetyStatus` — spec.md §3.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;
use crate::obstacle::ThreatLevel as HazardLevel; // shares the same 5-point scale
use crate::timestamp::Timestamp;

pub use HazardLevel as AlertLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Proceed,
    Caution,
    Stop,
    EmergencyStop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardAlert {
    pub alert_id: String,
    pub kind: String,
    pub level: AlertLevel,
    pub t: Timestamp,
    pub description: String,
    pub location: Option<Vec3>,
    pub sensor_context: BTreeMap<String, f64>,
    pub recommended_action: RecommendedAction,
    pub immediate_response_required: bool,
}

impl HazardAlert {
    /// De-duplication key per spec.md §4.5: `(source, kind, level)`.
    pub fn dedup_key(&self, source: &str) -> (String, String, AlertLevel) {
        (source.to_string(), self.kind.clone(), self.level)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyAxisFlags {
    pub tilt_safe: bool,
    pub drop_safe: bool,
    pub collision_safe: bool,
    pub weather_safe: bool,
    pub boundary_safe: bool,
}

impl SafetyAxisFlags {
    pub fn all_safe(&self) -> bool {
        self.tilt_safe && self.drop_safe && self.collision_safe && self.weather_safe && self.boundary_safe
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasuredQuantities {
    pub tilt_deg: f64,
    pub clearance_m: f64,
    pub jerk_g: f64,
    pub nearest_obstacle_m: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub boundary_signed_distance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyStatus {
    pub t: Timestamp,
    pub overall_safe: bool,
    pub level: AlertLevel,
    pub axis_flags: SafetyAxisFlags,
    pub measured: MeasuredQuantities,
    pub active_alerts: Vec<HazardAlert>,
    pub response_time_ms: f64,
}

impl SafetyStatus {
    /// spec.md §3 invariant: `overall_safe ⇔ all axis flags true ⇔ no alert
    /// with level ≥ high`.
    pub fn invariant_holds(&self) -> bool {
        let no_high_alert = !self.active_alerts.iter().any(|a| a.level >= AlertLevel::High);
        self.overall_safe == (self.axis_flags.all_safe() && no_high_alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::new(0, chrono::Utc::now())
    }

    #[test]
    fn invariant_detects_mismatch() {
        let status = SafetyStatus {
            t: ts(),
            overall_safe: true,
            level: AlertLevel::None,
            axis_flags: SafetyAxisFlags { tilt_safe: false, ..Default::default() },
            measured: MeasuredQuantities::default(),
            active_alerts: vec![],
            response_time_ms: 1.0,
        };
        assert!(!status.invariant_holds());
    }

    #[test]
    fn invariant_holds_when_consistent() {
        let status = SafetyStatus {
            t: ts(),
            overall_safe: true,
            level: AlertLevel::None,
            axis_flags: SafetyAxisFlags {
                tilt_safe: true,
                drop_safe: true,
                collision_safe: true,
                weather_safe: true,
                boundary_safe: true,
            },
            measured: MeasuredQuantities::default(),
            active_alerts: vec![],
            response_time_ms: 1.0,
        };
        assert!(status.invariant_holds());
    }
}
