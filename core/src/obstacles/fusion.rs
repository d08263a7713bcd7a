//! ToF + vision candidate extraction and fusion, grounded in
//! `obstacle_detection.py`'s `_process_tof_sensors`/`_process_computer_vision`/
//! `_fuse_detections`.

use std::collections::BTreeSet;

use sensor_types::{
    MountPose, ObstacleKind, RangeStatus, SensorSource, Size3, TofReading, Timestamp, Vec3,
    VisionClass, VisionDetectionReading,
};

/// An un-tracked detection before temporal fusion. Mirrors `ObstacleInfo`.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub kind: ObstacleKind,
    pub local_position: Vec3,
    pub size: Size3,
    pub confidence: f64,
    pub detected_by: BTreeSet<SensorSource>,
    pub distance: f64,
    pub observed_at: Timestamp,
}

/// 50cm fusion threshold between a ToF hit and a vision box, per the
/// source's `_fuse_detections`.
pub const FUSION_RADIUS_M: f64 = 0.5;

pub fn tof_candidate(reading: &TofReading, tof_max_range_m: f64) -> Option<Candidate> {
    if reading.range_status != RangeStatus::Valid || reading.downward {
        return None;
    }
    let distance_m = reading.distance_mm / 1000.0;
    if distance_m <= 0.0 || distance_m > tof_max_range_m {
        return None;
    }
    let offset = reading.mount.offset;
    let axis = reading.mount.axis;
    let local_position = Vec3::new(
        offset.x + axis.x * distance_m,
        offset.y + axis.y * distance_m,
        offset.z + axis.z * distance_m,
    );
    let mut detected_by = BTreeSet::new();
    detected_by.insert(SensorSource::Tof);
    Some(Candidate {
        kind: ObstacleKind::Unknown,
        local_position,
        size: Size3 { w: 0.1, h: 0.1, d: 0.1 },
        confidence: 0.8,
        detected_by,
        distance: distance_m,
        observed_at: reading.header.timestamp,
    })
}

fn vision_class_to_kind(class: VisionClass) -> ObstacleKind {
    match class {
        VisionClass::Person => ObstacleKind::Person,
        VisionClass::Child => ObstacleKind::Child,
        VisionClass::Dog | VisionClass::Cat => ObstacleKind::Pet,
        VisionClass::Car | VisionClass::Bicycle => ObstacleKind::Vehicle,
        VisionClass::Unknown => ObstacleKind::Unknown,
    }
}

/// Vision detections carry no 3D position unless `depth_estimate_m` is
/// present (monocular estimate); detections without depth are dropped
/// before fusion since they cannot be placed in the local frame.
pub fn vision_candidate(reading: &VisionDetectionReading, camera_mount: &MountPose) -> Option<Candidate> {
    let depth = reading.depth_estimate_m?;
    if depth <= 0.0 {
        return None;
    }
    let lateral = (reading.bbox.center_x() - 0.5) * depth;
    let local_position = Vec3::new(
        camera_mount.offset.x + depth,
        camera_mount.offset.y + lateral,
        camera_mount.offset.z,
    );
    let mut detected_by = BTreeSet::new();
    detected_by.insert(SensorSource::Vision);
    Some(Candidate {
        kind: vision_class_to_kind(reading.class),
        local_position,
        size: Size3 { w: reading.bbox.width * depth, h: reading.bbox.height * depth, d: 0.2 },
        confidence: reading.confidence,
        detected_by,
        distance: local_position.norm(),
        observed_at: reading.header.timestamp,
    })
}

/// Merge ToF (trusted) and vision candidates that refer to the same
/// physical obstacle within [`FUSION_RADIUS_M`].
pub fn fuse(tof: Vec<Candidate>, vision: Vec<Candidate>) -> Vec<Candidate> {
    let mut fused = tof;
    'outer: for v in vision {
        for t in fused.iter_mut() {
            if v.detected_by.iter().any(|s| t.detected_by.contains(s)) {
                continue;
            }
            let d = v.local_position.sub(&t.local_position).norm();
            if d < FUSION_RADIUS_M {
                t.kind = v.kind;
                t.size.w = t.size.w.max(v.size.w);
                t.size.h = t.size.h.max(v.size.h);
                t.size.d = t.size.d.max(v.size.d);
                t.detected_by.extend(v.detected_by.iter().copied());
                t.confidence = (t.confidence + v.confidence * 0.5).min(1.0);
                continue 'outer;
            }
        }
        fused.push(v);
    }
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(pos: Vec3, source: SensorSource) -> Candidate {
        let mut detected_by = BTreeSet::new();
        detected_by.insert(source);
        Candidate {
            kind: ObstacleKind::Unknown,
            local_position: pos,
            size: Size3::default(),
            confidence: 0.8,
            detected_by,
            distance: pos.norm(),
            observed_at: Timestamp::new(0, chrono::Utc::now()),
        }
    }

    #[test]
    fn nearby_candidates_merge() {
        let tof = vec![candidate(Vec3::new(1.0, 0.0, 0.0), SensorSource::Tof)];
        let vision = vec![candidate(Vec3::new(1.2, 0.0, 0.0), SensorSource::Vision)];
        let fused = fuse(tof, vision);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].detected_by.len(), 2);
    }

    #[test]
    fn distant_candidates_stay_separate() {
        let tof = vec![candidate(Vec3::new(1.0, 0.0, 0.0), SensorSource::Tof)];
        let vision = vec![candidate(Vec3::new(5.0, 0.0, 0.0), SensorSource::Vision)];
        let fused = fuse(tof, vision);
        assert_eq!(fused.len(), 2);
    }
}
