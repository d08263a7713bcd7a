//! `Obstacle` / `ObstacleMap` — spec.md §3.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Unknown,
    Person,
    Pet,
    Child,
    Static,
    Dynamic,
    Vegetation,
    Cliff,
    Water,
    Vehicle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SensorSource {
    Tof,
    Vision,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size3 {
    pub w: f64,
    pub h: f64,
    pub d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub obstacle_id: String,
    pub kind: ObstacleKind,
    pub local_position: Vec3,
    pub size: Size3,
    pub velocity: Vec3,
    pub confidence: f64,
    pub detected_by: BTreeSet<SensorSource>,
    pub distance: f64,
    pub first_seen: Timestamp,
    pub last_updated: Timestamp,
    pub threat_level: ThreatLevel,
}

impl Obstacle {
    /// spec.md §8 invariant: `distance == ‖position‖` within 1e-6.
    pub fn distance_consistent(&self) -> bool {
        (self.distance - self.local_position.norm()).abs() < 1e-6
    }

    pub fn recompute_distance(&mut self) {
        self.distance = self.local_position.norm();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleMapSummary {
    pub total: usize,
    pub by_kind: std::collections::BTreeMap<ObstacleKind, usize>,
    pub max_threat: ThreatLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleMap {
    pub t: Timestamp,
    pub obstacles: Vec<Obstacle>,
    pub map_radius_m: f64,
    pub summary: ObstacleMapSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_matches_norm() {
        let mut o = Obstacle {
            obstacle_id: "x".into(),
            kind: ObstacleKind::Person,
            local_position: Vec3::new(3.0, 4.0, 0.0),
            size: Size3::default(),
            velocity: Vec3::ZERO,
            confidence: 0.9,
            detected_by: BTreeSet::new(),
            distance: 0.0,
            first_seen: Timestamp::new(0, chrono::Utc::now()),
            last_updated: Timestamp::new(0, chrono::Utc::now()),
            threat_level: ThreatLevel::Medium,
        };
        assert!(!o.distance_consistent());
        o.recompute_distance();
        assert!(o.distance_consistent());
        assert!((o.distance - 5.0).abs() < 1e-9);
    }
}
