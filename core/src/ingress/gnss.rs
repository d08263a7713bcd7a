//! GNSS/RTK adapter. Grounded in the source's GPS handling in
//! `sensor_fusion/localization.py` (`_handle_gps_data`): latitude/longitude
//! must be finite and within WGS-84 bounds, horizontal accuracy and HDOP
//! must be non-negative, and an RTK fix is only trusted once the reported
//! fix kind says so.

use sensor_types::{FixKind, GeoPoint, GnssReading, ReadingHeader, Timestamp};

use crate::error::IngressError;
use crate::ingress::{require_finite, require_range};

/// Raw frame as produced by the GNSS driver, before validation.
#[derive(Debug, Clone)]
pub struct RawGnssFrame {
    pub sensor_id: String,
    pub port_or_bus_id: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub horizontal_accuracy_m: f64,
    pub satellite_count: u32,
    pub fix_kind: FixKind,
    pub hdop: f64,
    pub speed_mps: f64,
    pub rtk_status: Option<String>,
}

pub fn validate(frame: RawGnssFrame, timestamp: Timestamp) -> Result<GnssReading, IngressError> {
    let lat = require_range(frame.lat, "lat", &frame.sensor_id, -90.0, 90.0)?;
    let lon = require_range(frame.lon, "lon", &frame.sensor_id, -180.0, 180.0)?;
    let altitude = require_finite(frame.altitude, "altitude", &frame.sensor_id)?;
    let horizontal_accuracy_m =
        require_range(frame.horizontal_accuracy_m, "horizontal_accuracy_m", &frame.sensor_id, 0.0, 1000.0)?;
    let hdop = require_range(frame.hdop, "hdop", &frame.sensor_id, 0.0, 100.0)?;
    let speed_mps = require_range(frame.speed_mps, "speed_mps", &frame.sensor_id, 0.0, 50.0)?;

    let quality = match frame.fix_kind {
        FixKind::Rtk => 1.0,
        FixKind::Fix3d => 0.7,
        FixKind::Fix2d => 0.4,
        FixKind::None => 0.0,
    };

    Ok(GnssReading {
        header: ReadingHeader {
            timestamp,
            sensor_id: frame.sensor_id,
            quality: quality.clamp(0.0, 1.0),
            port_or_bus_id: frame.port_or_bus_id,
        },
        position: GeoPoint { lat, lon },
        altitude,
        horizontal_accuracy_m,
        satellite_count: frame.satellite_count,
        fix_kind: frame.fix_kind,
        hdop,
        speed_mps,
        rtk_status: frame.rtk_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    fn good_frame() -> RawGnssFrame {
        RawGnssFrame {
            sensor_id: "gnss0".into(),
            port_or_bus_id: "/dev/ttyACM0".into(),
            lat: 40.0,
            lon: -105.0,
            altitude: 1600.0,
            horizontal_accuracy_m: 0.02,
            satellite_count: 18,
            fix_kind: FixKind::Rtk,
            hdop: 0.8,
            speed_mps: 0.3,
            rtk_status: Some("fixed".into()),
        }
    }

    #[test]
    fn valid_frame_passes() {
        let reading = validate(good_frame(), ts()).unwrap();
        assert_eq!(reading.fix_kind, FixKind::Rtk);
        assert!((reading.header.quality - 1.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_latitude_rejected() {
        let mut frame = good_frame();
        frame.lat = 200.0;
        assert!(validate(frame, ts()).is_err());
    }

    #[test]
    fn non_finite_altitude_rejected() {
        let mut frame = good_frame();
        frame.altitude = f64::NAN;
        assert!(validate(frame, ts()).is_err());
    }
}
