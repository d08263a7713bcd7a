//! Threat-level classification: a base radius and base threat level per
//! obstacle kind, escalated further by closing speed (positive approach
//! velocity dot product) outside that radius, matching spec.md §4.4.

use sensor_types::{Obstacle, ObstacleKind, ThreatLevel};

/// Distance (m) inside which an obstacle kind is inherently `high` threat
/// even if stationary, per the source's threat pattern table
/// (`hazard_detector.py` ~L100-140): child gets 1.5x the person radius.
fn base_safety_radius_m(kind: ObstacleKind) -> f64 {
    match kind {
        ObstacleKind::Person => 3.0,
        ObstacleKind::Child => 4.5,
        ObstacleKind::Vehicle => 5.0,
        ObstacleKind::Pet => 1.5,
        ObstacleKind::Water => 1.0,
        ObstacleKind::Static => 0.5,
        ObstacleKind::Unknown | ObstacleKind::Vegetation | ObstacleKind::Dynamic | ObstacleKind::Cliff => 1.0,
    }
}

/// Threat level a kind carries just by being inside its safety radius,
/// per the source's threat pattern table: people are always `critical`,
/// pets/vehicles/water are always at least `high`.
fn base_threat_level(kind: ObstacleKind) -> ThreatLevel {
    match kind {
        ObstacleKind::Person | ObstacleKind::Child => ThreatLevel::Critical,
        ObstacleKind::Pet | ObstacleKind::Vehicle | ObstacleKind::Water => ThreatLevel::High,
        ObstacleKind::Static | ObstacleKind::Vegetation | ObstacleKind::Unknown | ObstacleKind::Dynamic | ObstacleKind::Cliff => {
            ThreatLevel::Medium
        }
    }
}

/// Closing speed toward the mower, m/s: negative radial velocity (the dot
/// product of obstacle velocity and the unit vector from obstacle to
/// origin) means the obstacle is approaching.
fn approach_speed_mps(obstacle: &Obstacle) -> f64 {
    let distance = obstacle.local_position.norm();
    if distance < 1e-6 {
        return 0.0;
    }
    let to_origin = obstacle.local_position.scale(-1.0 / distance);
    obstacle.velocity.dot(&to_origin)
}

pub fn classify(obstacle: &Obstacle, emergency_stop_distance_m: f64, proximity_critical_m: f64) -> ThreatLevel {
    let radius = base_safety_radius_m(obstacle.kind);
    let closing = approach_speed_mps(obstacle);

    if obstacle.distance <= emergency_stop_distance_m {
        return ThreatLevel::Critical;
    }
    if obstacle.distance <= proximity_critical_m {
        return ThreatLevel::High;
    }
    if obstacle.distance <= radius {
        return base_threat_level(obstacle.kind).max(ThreatLevel::High);
    }
    if obstacle.distance <= radius * 2.0 && closing > 0.3 {
        return ThreatLevel::Medium;
    }
    if obstacle.distance <= radius * 2.0 {
        return ThreatLevel::Low;
    }
    ThreatLevel::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sensor_types::{Timestamp, Vec3};
    use std::collections::BTreeSet;

    fn obstacle(distance: f64, velocity: Vec3, kind: ObstacleKind) -> Obstacle {
        Obstacle {
            obstacle_id: "x".into(),
            kind,
            local_position: Vec3::new(distance, 0.0, 0.0),
            size: sensor_types::Size3::default(),
            velocity,
            confidence: 0.9,
            detected_by: BTreeSet::new(),
            distance,
            first_seen: Timestamp::new(0, Utc::now()),
            last_updated: Timestamp::new(0, Utc::now()),
            threat_level: ThreatLevel::None,
        }
    }

    #[test]
    fn very_close_obstacle_is_critical() {
        let obs = obstacle(0.1, Vec3::ZERO, ObstacleKind::Unknown);
        assert_eq!(classify(&obs, 0.15, 0.30), ThreatLevel::Critical);
    }

    #[test]
    fn approaching_obstacle_escalates_over_stationary() {
        let stationary = obstacle(1.0, Vec3::ZERO, ObstacleKind::Person);
        let approaching = obstacle(1.0, Vec3::new(-1.0, 0.0, 0.0), ObstacleKind::Person);
        let a = classify(&stationary, 0.15, 0.30);
        let b = classify(&approaching, 0.15, 0.30);
        assert!(b >= a);
    }

    #[test]
    fn stationary_person_in_radius_is_critical() {
        let obs = obstacle(2.5, Vec3::ZERO, ObstacleKind::Person);
        assert_eq!(classify(&obs, 0.15, 0.30), ThreatLevel::Critical);
    }

    #[test]
    fn stationary_pet_in_radius_is_high() {
        let obs = obstacle(1.0, Vec3::ZERO, ObstacleKind::Pet);
        assert_eq!(classify(&obs, 0.15, 0.30), ThreatLevel::High);
    }

    #[test]
    fn distant_obstacle_is_no_threat() {
        let obs = obstacle(50.0, Vec3::ZERO, ObstacleKind::Person);
        assert_eq!(classify(&obs, 0.15, 0.30), ThreatLevel::None);
    }
}
