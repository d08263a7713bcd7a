//! Wire-level vocabulary shared across the safety core: sensor readings,
//! pose/obstacle/hazard/safety-status payloads, and the topic namespace.
//!
//! These are the types that cross process boundaries (published on the
//! message fabric, or decoded from raw sensor frames); subsystem-internal
//! state (EKF covariance scratch space, tracker bookkeeping) lives in the
//! `core` crate instead.

pub mod boundary;
pub mod emergency;
pub mod geometry;
pub mod hazard;
pub mod maintenance;
pub mod obstacle;
pub mod pose;
pub mod reading;
pub mod telemetry;
pub mod timestamp;
pub mod topic;

pub use boundary::{BoundaryPolygon, BoundaryViolation, BoundaryViolationKind, NoGoZone, NoGoZoneKind};
pub use emergency::{EmergencyActionId, EmergencyActionOutcome, EmergencyState};
pub use geometry::{GeoPoint, Quaternion, Vec3};
pub use hazard::{AlertLevel, HazardAlert, MeasuredQuantities, RecommendedAction, SafetyAxisFlags, SafetyStatus};
pub use maintenance::{BatteryHealth, BatteryHealthStatus, BladeCondition, BladeWear, LockoutKind, LockoutSeverity, MaintenanceLockout};
pub use obstacle::{Obstacle, ObstacleKind, ObstacleMap, ObstacleMapSummary, SensorSource, Size3, ThreatLevel};
pub use pose::{Covariance6, PoseEstimate};
pub use reading::{
    CalibrationScore, EncoderStatusReading, EnvironmentalReading, FixKind, GnssReading, ImuReading,
    MountPose, NormalizedBoundingBox, PowerReading, RangeStatus, ReadingHeader, SensorReading,
    TofReading, VisionClass, VisionDetectionReading,
};
pub use telemetry::TelemetrySnapshot;
pub use timestamp::Timestamp;
