//! Blade wear, battery health, and maintenance lockout records — spec.md §3.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BladeCondition {
    Sharp,
    SlightlyDull,
    Dull,
    VeryDull,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BladeWear {
    pub blade_id: String,
    pub t: Timestamp,
    pub condition: BladeCondition,
    pub sharpness_score: f64,
    pub wear_pct: f64,
    pub vibration_g: f64,
    pub estimated_remaining_hours: f64,
    pub replacement_recommended: bool,
    pub safety_concern: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatteryHealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryHealth {
    pub battery_id: String,
    pub t: Timestamp,
    pub status: BatteryHealthStatus,
    pub capacity_pct: f64,
    pub temperature_c: f64,
    pub safety_concerns: Vec<String>,
    pub estimated_remaining_life_days: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutSeverity {
    Advisory,
    Blocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutKind {
    BladeSafety,
    BatterySafety,
    MechanicalIssue,
    WeatherSafety,
    SlopeSafety,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceLockout {
    pub lockout_id: String,
    pub kind: LockoutKind,
    pub severity: LockoutSeverity,
    pub reason: String,
    pub affected_subsystems: Vec<String>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub override_level: Option<String>,
}
