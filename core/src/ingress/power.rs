//! Power/battery telemetry adapter, grounded in the source's
//! `hardware.power_management` readings feeding `maintenance_safety.py`.

use sensor_types::{PowerReading, ReadingHeader, Timestamp};

use crate::error::IngressError;
use crate::ingress::{require_finite, require_range};

#[derive(Debug, Clone)]
pub struct RawPowerFrame {
    pub sensor_id: String,
    pub port_or_bus_id: String,
    pub battery_voltage: f64,
    pub battery_current: f64,
    pub solar_voltage: f64,
    pub solar_current: f64,
    pub load_current: f64,
    pub charge_cycle_count: u32,
    pub cell_temperature_c: f64,
    pub capacity_pct: f64,
}

pub fn validate(frame: RawPowerFrame, timestamp: Timestamp) -> Result<PowerReading, IngressError> {
    let battery_voltage = require_range(frame.battery_voltage, "battery_voltage", &frame.sensor_id, 0.0, 60.0)?;
    let battery_current = require_finite(frame.battery_current, "battery_current", &frame.sensor_id)?;
    let solar_voltage = require_range(frame.solar_voltage, "solar_voltage", &frame.sensor_id, 0.0, 60.0)?;
    let solar_current = require_finite(frame.solar_current, "solar_current", &frame.sensor_id)?;
    let load_current = require_finite(frame.load_current, "load_current", &frame.sensor_id)?;
    let cell_temperature_c =
        require_range(frame.cell_temperature_c, "cell_temperature_c", &frame.sensor_id, -40.0, 85.0)?;
    let capacity_pct = require_range(frame.capacity_pct, "capacity_pct", &frame.sensor_id, 0.0, 100.0)?;

    Ok(PowerReading {
        header: ReadingHeader {
            timestamp,
            sensor_id: frame.sensor_id,
            quality: 1.0,
            port_or_bus_id: frame.port_or_bus_id,
        },
        battery_voltage,
        battery_current,
        solar_voltage,
        solar_current,
        solar_power: solar_voltage * solar_current,
        load_current,
        charge_cycle_count: frame.charge_cycle_count,
        cell_temperature_c,
        capacity_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn solar_power_is_derived() {
        let frame = RawPowerFrame {
            sensor_id: "power0".into(),
            port_or_bus_id: "i2c-4".into(),
            battery_voltage: 24.5,
            battery_current: -2.0,
            solar_voltage: 20.0,
            solar_current: 1.5,
            load_current: 2.0,
            charge_cycle_count: 12,
            cell_temperature_c: 28.0,
            capacity_pct: 80.0,
        };
        let reading = validate(frame, Timestamp::new(0, Utc::now())).unwrap();
        assert!((reading.solar_power - 30.0).abs() < 1e-9);
    }
}
