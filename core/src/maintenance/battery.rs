//! Battery health bucketing and safety-concern detection, grounded in
//! `safety/maintenance_safety.py`'s `_analyze_battery_health`.

use sensor_types::{BatteryHealth, BatteryHealthStatus, PowerReading, Timestamp};

use crate::config::BatteryConfig;

pub fn assess(reading: &PowerReading, config: &BatteryConfig, now: Timestamp) -> BatteryHealth {
    let capacity_pct = reading.capacity_pct;
    let status = if capacity_pct > 90.0 {
        BatteryHealthStatus::Excellent
    } else if capacity_pct > 80.0 {
        BatteryHealthStatus::Good
    } else if capacity_pct > 70.0 {
        BatteryHealthStatus::Fair
    } else if capacity_pct > 50.0 {
        BatteryHealthStatus::Poor
    } else if capacity_pct > 20.0 {
        BatteryHealthStatus::Critical
    } else {
        BatteryHealthStatus::Failed
    };

    let mut safety_concerns = Vec::new();
    if reading.cell_temperature_c > config.overheat_c {
        safety_concerns.push("overheating".to_string());
    }
    if reading.battery_voltage < config.undervoltage_v {
        safety_concerns.push("low_voltage".to_string());
    }
    if capacity_pct < config.low_capacity_pct {
        safety_concerns.push("low_capacity".to_string());
    }
    if reading.cell_temperature_c < config.cold_c {
        safety_concerns.push("too_cold".to_string());
    }

    let degradation_per_cycle = if reading.charge_cycle_count > 0 {
        (100.0 - capacity_pct) / reading.charge_cycle_count as f64
    } else {
        0.0
    };
    let estimated_remaining_life_days = if degradation_per_cycle > 0.0 {
        ((capacity_pct - 20.0) / degradation_per_cycle) * 2.0
    } else {
        365.0 * 5.0
    };

    BatteryHealth {
        battery_id: "main".to_string(),
        t: now,
        status,
        capacity_pct,
        temperature_c: reading.cell_temperature_c,
        safety_concerns,
        estimated_remaining_life_days: estimated_remaining_life_days.max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts() -> Timestamp {
        Timestamp::new(0, Utc::now())
    }

    fn reading(capacity_pct: f64, temp: f64, voltage: f64) -> PowerReading {
        PowerReading {
            header: sensor_types::ReadingHeader { timestamp: ts(), sensor_id: "power0".into(), quality: 1.0, port_or_bus_id: "i2c0".into() },
            battery_voltage: voltage,
            battery_current: 1.0,
            solar_voltage: 0.0,
            solar_current: 0.0,
            solar_power: 0.0,
            load_current: 2.0,
            charge_cycle_count: 100,
            cell_temperature_c: temp,
            capacity_pct,
        }
    }

    #[test]
    fn healthy_battery_has_no_concerns() {
        let config = BatteryConfig::default();
        let health = assess(&reading(95.0, 25.0, 12.6), &config, ts());
        assert_eq!(health.status, BatteryHealthStatus::Excellent);
        assert!(health.safety_concerns.is_empty());
    }

    #[test]
    fn overheating_battery_is_flagged() {
        let config = BatteryConfig::default();
        let health = assess(&reading(60.0, 50.0, 12.0), &config, ts());
        assert!(health.safety_concerns.contains(&"overheating".to_string()));
    }
}
