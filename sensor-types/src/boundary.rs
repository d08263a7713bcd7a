//! `BoundaryPolygon` / `NoGoZone` — spec.md §3.

use serde::{Deserialize, Serialize};

use crate::geometry::GeoPoint;
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryPolygon {
    /// Ordered ring of at least 3 points; not implicitly closed (first ≠ last).
    pub points: Vec<GeoPoint>,
}

impl BoundaryPolygon {
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoGoZoneKind {
    Flowerbed,
    Pond,
    Steep,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoGoZone {
    pub zone_id: String,
    pub polygon: BoundaryPolygon,
    pub active: bool,
    pub kind: NoGoZoneKind,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryViolationKind {
    BoundaryExit,
    SafetyMargin,
    NoGoEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryViolation {
    pub violation_id: String,
    pub kind: BoundaryViolationKind,
    pub signed_distance_m: f64,
    pub zone_id: Option<String>,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
}
