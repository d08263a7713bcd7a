//! `TelemetrySnapshot` — spec.md §3/§5, periodic system-wide rollup for
//! dashboards and the health endpoint.

use serde::{Deserialize, Serialize};

use crate::emergency::EmergencyState;
use crate::hazard::SafetyStatus;
use crate::maintenance::MaintenanceLockout;
use crate::obstacle::ObstacleMapSummary;
use crate::pose::PoseEstimate;
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub t: Timestamp,
    pub uptime_s: f64,
    pub pose: Option<PoseEstimate>,
    pub safety: SafetyStatus,
    pub emergency: EmergencyState,
    pub obstacles: ObstacleMapSummary,
    pub lockouts: Vec<MaintenanceLockout>,
}
