//! Temporal obstacle tracking: nearest-match association within 30cm and
//! a 2s eviction timeout, grounded in `_update_obstacle_tracking`.

use std::collections::HashMap;
use std::time::Duration;

use sensor_types::{Obstacle, Timestamp};
use uuid::Uuid;

use crate::obstacles::fusion::Candidate;

/// Matching threshold between a new detection and an existing track.
pub const TRACK_MATCH_RADIUS_M: f64 = 0.3;

pub struct Tracker {
    tracks: HashMap<String, Obstacle>,
    eviction_timeout: Duration,
}

impl Tracker {
    pub fn new(eviction_timeout: Duration) -> Self {
        Self { tracks: HashMap::new(), eviction_timeout }
    }

    /// Associate each candidate with its nearest track (within
    /// [`TRACK_MATCH_RADIUS_M`]) or start a new one, then evict tracks
    /// not updated within the timeout.
    pub fn update(&mut self, candidates: Vec<Candidate>, now: Timestamp) {
        for candidate in candidates {
            let best = self
                .tracks
                .iter()
                .map(|(id, obs)| (id.clone(), obs.local_position.sub(&candidate.local_position).norm()))
                .filter(|(_, d)| *d < TRACK_MATCH_RADIUS_M)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match best {
                Some((id, _)) => {
                    let track = self.tracks.get_mut(&id).unwrap();
                    let dt = now.elapsed_since(&track.last_updated).as_secs_f64();
                    if dt > 0.0 {
                        track.velocity = track.local_position.sub(&candidate.local_position).scale(-1.0 / dt);
                    }
                    track.local_position = candidate.local_position;
                    track.kind = candidate.kind;
                    track.size = candidate.size;
                    track.confidence = candidate.confidence;
                    track.detected_by = candidate.detected_by;
                    track.distance = candidate.distance;
                    track.last_updated = now;
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    self.tracks.insert(
                        id.clone(),
                        Obstacle {
                            obstacle_id: id,
                            kind: candidate.kind,
                            local_position: candidate.local_position,
                            size: candidate.size,
                            velocity: sensor_types::Vec3::ZERO,
                            confidence: candidate.confidence,
                            detected_by: candidate.detected_by,
                            distance: candidate.distance,
                            first_seen: candidate.observed_at,
                            last_updated: candidate.observed_at,
                            threat_level: sensor_types::ThreatLevel::None,
                        },
                    );
                }
            }
        }

        self.tracks.retain(|_, obs| !obs.last_updated.is_older_than(&now, self.eviction_timeout));
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Obstacle> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sensor_types::Vec3;
    use std::collections::BTreeSet;

    fn ts(ms: u64) -> Timestamp {
        Timestamp::new(ms * 1_000_000, Utc::now())
    }

    fn candidate(pos: Vec3, at: Timestamp) -> Candidate {
        Candidate {
            kind: sensor_types::ObstacleKind::Unknown,
            local_position: pos,
            size: sensor_types::Size3::default(),
            confidence: 0.9,
            detected_by: BTreeSet::new(),
            distance: pos.norm(),
            observed_at: at,
        }
    }

    #[test]
    fn nearby_detection_updates_existing_track() {
        let mut tracker = Tracker::new(Duration::from_secs(2));
        tracker.update(vec![candidate(Vec3::new(1.0, 0.0, 0.0), ts(0))], ts(0));
        assert_eq!(tracker.len(), 1);
        tracker.update(vec![candidate(Vec3::new(1.05, 0.0, 0.0), ts(100))], ts(100));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn stale_tracks_are_evicted() {
        let mut tracker = Tracker::new(Duration::from_secs(2));
        tracker.update(vec![candidate(Vec3::new(1.0, 0.0, 0.0), ts(0))], ts(0));
        tracker.update(vec![], ts(3000));
        assert!(tracker.is_empty());
    }
}
