//! Vision detection adapter. Bounding boxes are normalized to [0, 1];
//! camera FOV constants (62.2° horizontal / 82.6° wide-angle vertical,
//! spec.md §10) live here since they're only needed to interpret
//! `bbox`/`depth_estimate_m` geometrically, not to validate the frame.

use sensor_types::{NormalizedBoundingBox, ReadingHeader, Timestamp, VisionClass, VisionDetectionReading};

use crate::error::IngressError;
use crate::ingress::{require_finite, require_range};

/// Horizontal field of view of the primary forward camera, degrees.
pub const CAMERA_FOV_HORIZONTAL_DEG: f64 = 62.2;
/// Vertical field of view of the wide-angle variant, degrees.
pub const CAMERA_FOV_WIDE_VERTICAL_DEG: f64 = 82.6;

#[derive(Debug, Clone)]
pub struct RawVisionFrame {
    pub sensor_id: String,
    pub port_or_bus_id: String,
    pub class: VisionClass,
    pub confidence: f64,
    pub bbox: NormalizedBoundingBox,
    pub depth_estimate_m: Option<f64>,
}

pub fn validate(frame: RawVisionFrame, timestamp: Timestamp) -> Result<VisionDetectionReading, IngressError> {
    let confidence = require_range(frame.confidence, "confidence", &frame.sensor_id, 0.0, 1.0)?;
    for (field, value) in [
        ("bbox.x", frame.bbox.x),
        ("bbox.y", frame.bbox.y),
        ("bbox.width", frame.bbox.width),
        ("bbox.height", frame.bbox.height),
    ] {
        require_range(value, field, &frame.sensor_id, 0.0, 1.0)?;
    }
    if let Some(depth) = frame.depth_estimate_m {
        require_finite(depth, "depth_estimate_m", &frame.sensor_id)?;
    }

    Ok(VisionDetectionReading {
        header: ReadingHeader {
            timestamp,
            sensor_id: frame.sensor_id,
            quality: confidence,
            port_or_bus_id: frame.port_or_bus_id,
        },
        class: frame.class,
        confidence,
        bbox: frame.bbox,
        depth_estimate_m: frame.depth_estimate_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn bbox_outside_unit_square_rejected() {
        let frame = RawVisionFrame {
            sensor_id: "cam_front".into(),
            port_or_bus_id: "csi0".into(),
            class: VisionClass::Person,
            confidence: 0.9,
            bbox: NormalizedBoundingBox { x: 1.2, y: 0.1, width: 0.2, height: 0.3 },
            depth_estimate_m: Some(2.0),
        };
        assert!(validate(frame, Timestamp::new(0, Utc::now())).is_err());
    }
}
