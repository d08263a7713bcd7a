//! Configuration: a single YAML file with a `safety:` block (all thresholds
//! from spec.md §4.5/§4.8) and an optional `maintenance:` block overriding
//! startup grace, per spec.md §6. Missing values fall back to the defaults
//! named throughout spec.md. Partial user YAML is deep-merged over the
//! built-in defaults (grounded in the source's `_merge_config`), so a
//! config naming only one threshold doesn't need to repeat the rest.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiltConfig {
    pub medium_deg: f64,
    pub high_deg: f64,
    pub critical_deg: f64,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self { medium_deg: 15.0, high_deg: 20.0, critical_deg: 25.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropConfig {
    pub critical_cm: f64,
    /// spec.md §9 OQ2: whether a downward ToF sensor is assumed present.
    pub assume_downward_tof: bool,
    pub default_clearance_m: f64,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self { critical_cm: 5.0, assume_downward_tof: false, default_clearance_m: 0.1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    pub critical_g: f64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { critical_g: 2.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximityConfig {
    pub high_m: f64,
    pub critical_m: f64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self { high_m: 0.30, critical_m: 0.15 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    pub min_c: f64,
    pub max_c: f64,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self { min_c: 5.0, max_c: 40.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WetConfig {
    pub humidity_pct: f64,
}

impl Default for WetConfig {
    fn default() -> Self {
        Self { humidity_pct: 95.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlopeConfig {
    pub caution_deg: f64,
    pub unsafe_deg: f64,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self { caution_deg: 10.0, unsafe_deg: 15.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    pub margin_m: f64,
    pub critical_outside_m: f64,
    pub accuracy_threshold_m: f64,
    pub hysteresis_window_s: f64,
    pub eviction_age_s: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            margin_m: 1.0,
            critical_outside_m: 3.0,
            accuracy_threshold_m: 2.0,
            hysteresis_window_s: 5.0,
            eviction_age_s: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BladeConfig {
    pub baseline_current_a: f64,
    pub wear_attention_pct: f64,
    pub wear_critical_pct: f64,
    pub vibration_threshold_g: f64,
    pub window_minutes: f64,
}

impl Default for BladeConfig {
    fn default() -> Self {
        Self {
            baseline_current_a: 2.0,
            wear_attention_pct: 70.0,
            wear_critical_pct: 85.0,
            vibration_threshold_g: 2.0,
            window_minutes: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub overheat_c: f64,
    pub undervoltage_v: f64,
    pub low_capacity_pct: f64,
    pub cold_c: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self { overheat_c: 45.0, undervoltage_v: 10.0, low_capacity_pct: 30.0, cold_c: -10.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleConfig {
    pub tracking_timeout_s: f64,
    pub safety_distance_m: f64,
    pub tof_max_range_m: f64,
    pub vision_match_radius_m: f64,
    pub track_match_radius_m: f64,
    pub emergency_stop_distance_m: f64,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            tracking_timeout_s: 2.0,
            safety_distance_m: 0.30,
            tof_max_range_m: 2.0,
            vision_match_radius_m: 0.5,
            track_match_radius_m: 0.3,
            emergency_stop_distance_m: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseTimeouts {
    pub warning_s: f64,
    pub caution_s: f64,
    pub immediate_s: f64,
    pub emergency_s: f64,
}

impl Default for ResponseTimeouts {
    fn default() -> Self {
        Self { warning_s: 300.0, caution_s: 120.0, immediate_s: 30.0, emergency_s: 5.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub tilt: TiltConfig,
    pub drop: DropConfig,
    pub collision: CollisionConfig,
    pub proximity: ProximityConfig,
    pub temperature: TemperatureConfig,
    pub wet: WetConfig,
    pub slope: SlopeConfig,
    pub boundary: BoundaryConfig,
    pub blade: BladeConfig,
    pub battery: BatteryConfig,
    pub obstacle: ObstacleConfig,
    pub response_timeouts: ResponseTimeouts,
    pub status_publish_rate_hz: f64,
    pub startup_grace_seconds: f64,
    pub dedup_window_s: f64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            tilt: TiltConfig::default(),
            drop: DropConfig::default(),
            collision: CollisionConfig::default(),
            proximity: ProximityConfig::default(),
            temperature: TemperatureConfig::default(),
            wet: WetConfig::default(),
            slope: SlopeConfig::default(),
            boundary: BoundaryConfig::default(),
            blade: BladeConfig::default(),
            battery: BatteryConfig::default(),
            obstacle: ObstacleConfig::default(),
            response_timeouts: ResponseTimeouts::default(),
            status_publish_rate_hz: 2.0,
            startup_grace_seconds: 180.0,
            dedup_window_s: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MaintenanceConfig {
    pub startup_grace_seconds: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    pub enforcement_interval_s: f64,
    pub heartbeat_timeout_s: f64,
    pub auto_timeout_s: f64,
    pub max_consecutive_misses: u32,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            enforcement_interval_s: 1.0,
            heartbeat_timeout_s: 10.0,
            auto_timeout_s: 300.0,
            max_consecutive_misses: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FabricConfig {
    pub queue_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub safety: SafetyConfig,
    pub maintenance: MaintenanceConfig,
    pub emergency: EmergencyConfig,
    pub fabric: FabricConfig,
}

impl AppConfig {
    /// Effective startup grace: `maintenance.startup_grace_seconds`
    /// overrides `safety.startup_grace_seconds` when present.
    pub fn startup_grace_seconds(&self) -> f64 {
        self.maintenance.startup_grace_seconds.unwrap_or(self.safety.startup_grace_seconds)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let default_value = serde_yaml::to_value(AppConfig::default()).expect("default config always serializes");

        if !path.exists() {
            return Ok(AppConfig::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let user_value: Value = serde_yaml::from_str(&text)?;
        let merged = deep_merge(default_value, user_value);
        let config: AppConfig = serde_yaml::from_value(merged)?;
        Ok(config)
    }
}

/// Deep-merge `override_value` on top of `base`, keeping any key the
/// override omits. Mirrors the source's `_merge_config`.
fn deep_merge(base: Value, over: Value) -> Value {
    match (base, over) {
        (Value::Mapping(mut base_map), Value::Mapping(over_map)) => {
            for (k, v) in over_map {
                let merged = match base_map.remove(&k) {
                    Some(base_v) => deep_merge(base_v, v),
                    None => v,
                };
                base_map.insert(k, merged);
            }
            Value::Mapping(base_map)
        }
        (_, over) => over,
    }
}

/// Environment variables consumed by ingress adapters (spec.md §6).
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub device_model: DeviceModel,
    pub sim_mode: bool,
    pub gps_device: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceModel {
    Pi4,
    Pi5,
}

impl DeviceModel {
    /// spec.md §6 platform cadence contract.
    pub fn telemetry_publish_hz(&self) -> f64 {
        match self {
            DeviceModel::Pi4 => 2.0,
            DeviceModel::Pi5 => 5.0,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let device_model = match std::env::var("DEVICE_MODEL").ok().as_deref() {
            Some("pi4") => DeviceModel::Pi4,
            _ => DeviceModel::Pi5,
        };
        let sim_mode = std::env::var("SIM_MODE").ok().as_deref() == Some("1");
        let gps_device = std::env::var("GPS_DEVICE").ok();
        Self { device_model, sim_mode, gps_device }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_uses_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/path.yaml")).unwrap();
        assert_eq!(cfg.safety.tilt.critical_deg, 25.0);
    }

    #[test]
    fn deep_merge_preserves_unspecified_keys() {
        let base = serde_yaml::to_value(AppConfig::default()).unwrap();
        let over: Value = serde_yaml::from_str("safety:\n  tilt:\n    critical_deg: 40.0\n").unwrap();
        let merged = deep_merge(base, over);
        let cfg: AppConfig = serde_yaml::from_value(merged).unwrap();
        assert_eq!(cfg.safety.tilt.critical_deg, 40.0);
        assert_eq!(cfg.safety.tilt.medium_deg, 15.0);
        assert_eq!(cfg.safety.boundary.margin_m, 1.0);
    }

    #[test]
    fn maintenance_overrides_startup_grace() {
        let mut cfg = AppConfig::default();
        cfg.maintenance.startup_grace_seconds = Some(60.0);
        assert_eq!(cfg.startup_grace_seconds(), 60.0);
    }
}
