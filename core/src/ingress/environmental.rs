//! Temperature/humidity/pressure adapter. No dedicated rain sensor exists
//! in the modeled hardware (spec.md §9 OQ1), so `rain_signal` is left
//! `None` here; the maintenance safety checks fall back to the
//! humidity > 95% proxy when it is absent.

use sensor_types::{EnvironmentalReading, ReadingHeader, Timestamp};

use crate::error::IngressError;
use crate::ingress::require_range;

#[derive(Debug, Clone)]
pub struct RawEnvironmentalFrame {
    pub sensor_id: String,
    pub port_or_bus_id: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub pressure_pa: f64,
    pub derived_altitude_m: f64,
    pub rain_signal: Option<bool>,
}

pub fn validate(frame: RawEnvironmentalFrame, timestamp: Timestamp) -> Result<EnvironmentalReading, IngressError> {
    let temperature_c = require_range(frame.temperature_c, "temperature_c", &frame.sensor_id, -40.0, 85.0)?;
    let humidity_pct = require_range(frame.humidity_pct, "humidity_pct", &frame.sensor_id, 0.0, 100.0)?;
    let pressure_pa = require_range(frame.pressure_pa, "pressure_pa", &frame.sensor_id, 30_000.0, 120_000.0)?;

    Ok(EnvironmentalReading {
        header: ReadingHeader {
            timestamp,
            sensor_id: frame.sensor_id,
            quality: 1.0,
            port_or_bus_id: frame.port_or_bus_id,
        },
        temperature_c,
        humidity_pct,
        pressure_pa,
        derived_altitude_m: frame.derived_altitude_m,
        rain_signal: frame.rain_signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    #[test]
    fn humidity_over_100_rejected() {
        let frame = RawEnvironmentalFrame {
            sensor_id: "env0".into(),
            port_or_bus_id: "i2c-3".into(),
            temperature_c: 22.0,
            humidity_pct: 150.0,
            pressure_pa: 101_325.0,
            derived_altitude_m: 100.0,
            rain_signal: None,
        };
        assert!(validate(frame, ts()).is_err());
    }
}
