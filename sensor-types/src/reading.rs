//! Polymorphic sensor reading model (spec.md §3 "SensorReading").
//!
//! Every reading carries a common header; the payload is a tagged variant.
//! Downstream consumers (localization, obstacle detection, safety) match on
//! the variant and never see untyped/dynamic payloads, per spec.md §9.

use serde::{Deserialize, Serialize};

use crate::geometry::{GeoPoint, Quaternion, Vec3};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingHeader {
    pub timestamp: Timestamp,
    pub sensor_id: String,
    /// Reading quality in [0, 1]; ingress adapters clamp to this range.
    pub quality: f64,
    pub port_or_bus_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    None,
    Fix2d,
    Fix3d,
    Rtk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GnssReading {
    pub header: ReadingHeader,
    pub position: GeoPoint,
    pub altitude: f64,
    pub horizontal_accuracy_m: f64,
    pub satellite_count: u32,
    pub fix_kind: FixKind,
    pub hdop: f64,
    pub speed_mps: f64,
    pub rtk_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationScore {
    Uncalibrated = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImuReading {
    pub header: ReadingHeader,
    pub quaternion: Quaternion,
    pub linear_acceleration: Vec3,
    pub angular_velocity: Vec3,
    pub magnetic_field: Option<Vec3>,
    pub calibration: CalibrationScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeStatus {
    Valid,
    TooClose,
    TooFar,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MountPose {
    pub offset: Vec3,
    /// Unit vector the sensor's axis points along, in body frame.
    pub axis: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TofReading {
    pub header: ReadingHeader,
    pub distance_mm: f64,
    pub range_status: RangeStatus,
    pub signal_strength: f64,
    pub mount: MountPose,
    /// True for the downward-facing rangefinder used by the drop check;
    /// false for forward-facing obstacle-detection units.
    pub downward: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalReading {
    pub header: ReadingHeader,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_pa: f64,
    pub derived_altitude_m: f64,
    /// Dedicated rain signal, if a rain sensor is present (spec.md §9 OQ1).
    /// `None` means the only available rain proxy is humidity > 95%.
    pub rain_signal: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerReading {
    pub header: ReadingHeader,
    pub battery_voltage: f64,
    /// Signed; positive = charging.
    pub battery_current: f64,
    pub solar_voltage: f64,
    pub solar_current: f64,
    pub solar_power: f64,
    pub load_current: f64,
    pub charge_cycle_count: u32,
    pub cell_temperature_c: f64,
    pub capacity_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderStatusReading {
    pub header: ReadingHeader,
    pub rc_enabled: bool,
    pub steer_pwm_us: u16,
    pub throttle_pwm_us: u16,
    pub tick_count: i64,
    pub link_alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedBoundingBox {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VisionClass {
    Person,
    Child,
    Dog,
    Cat,
    Car,
    Bicycle,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionDetectionReading {
    pub header: ReadingHeader,
    pub class: VisionClass,
    pub confidence: f64,
    pub bbox: NormalizedBoundingBox,
    pub depth_estimate_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SensorReading {
    Gnss(GnssReading),
    Imu(ImuReading),
    Tof(TofReading),
    Environmental(EnvironmentalReading),
    Power(PowerReading),
    EncoderStatus(EncoderStatusReading),
    VisionDetection(VisionDetectionReading),
}

impl SensorReading {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SensorReading::Gnss(r) => r.header.timestamp,
            SensorReading::Imu(r) => r.header.timestamp,
            SensorReading::Tof(r) => r.header.timestamp,
            SensorReading::Environmental(r) => r.header.timestamp,
            SensorReading::Power(r) => r.header.timestamp,
            SensorReading::EncoderStatus(r) => r.header.timestamp,
            SensorReading::VisionDetection(r) => r.header.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_center_x() {
        let b = NormalizedBoundingBox { x: 0.4, y: 0.3, width: 0.2, height: 0.4 };
        assert!((b.center_x() - 0.5).abs() < 1e-9);
    }
}
