//! Maintenance safety: blade wear, battery health, and slope/weather
//! lockouts, grounded in `safety/maintenance_safety.py`'s
//! `MaintenanceSafetySystem`. Distinct from `safety::SafetySupervisor`:
//! these are session-level advisories/lockouts on whether mowing should
//! start or continue, not instantaneous hazard responses.

pub mod battery;
pub mod blade;
pub mod weather;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::warn;

use sensor_types::{topic, LockoutKind, MaintenanceLockout, Quaternion, SensorReading};

use crate::clock::Clock;
use crate::config::SafetyConfig;
use crate::fabric::MessageFabric;
use blade::BladeMonitor;

struct Inner {
    blade: BladeMonitor,
    latest_orientation: Quaternion,
    latest_temperature_c: f64,
    latest_humidity_pct: f64,
    latest_rain: Option<bool>,
    lockouts: HashMap<LockoutKind, MaintenanceLockout>,
}

pub struct MaintenanceSupervisor {
    inner: Mutex<Inner>,
    config: SafetyConfig,
}

impl MaintenanceSupervisor {
    pub fn new(config: SafetyConfig) -> Self {
        let blade = BladeMonitor::new(&config.blade);
        Self {
            inner: Mutex::new(Inner {
                blade,
                latest_orientation: Quaternion::default(),
                latest_temperature_c: 20.0,
                latest_humidity_pct: 0.0,
                latest_rain: None,
                lockouts: HashMap::new(),
            }),
            config,
        }
    }

    pub async fn ingest(&self, reading: &SensorReading, clock: &Clock) {
        let now = clock.now();
        let mut inner = self.inner.lock().await;
        match reading {
            SensorReading::Power(r) => inner.blade.record_current(r.load_current, now),
            SensorReading::Imu(r) => {
                inner.latest_orientation = r.quaternion;
                inner.blade.record_vibration(r.linear_acceleration.norm() / 9.81, now);
            }
            SensorReading::Environmental(r) => {
                inner.latest_temperature_c = r.temperature_c;
                inner.latest_humidity_pct = r.humidity_pct;
                inner.latest_rain = r.rain_signal;
            }
            _ => {}
        }
    }

    /// Reassess blade wear, battery health (caller feeds separately via
    /// [`Self::ingest_battery`]), and slope/weather lockouts. Returns the
    /// current set of active lockouts.
    pub async fn tick(&self, clock: &Clock) -> Vec<MaintenanceLockout> {
        let now = clock.now();
        let mut inner = self.inner.lock().await;

        let is_raining = inner.latest_rain.unwrap_or(inner.latest_humidity_pct > self.config.wet.humidity_pct);
        let weather = weather::assess_weather(is_raining, inner.latest_temperature_c, self.config.temperature.min_c, self.config.temperature.max_c, now);
        match weather {
            Some(lockout) => {
                inner.lockouts.insert(LockoutKind::WeatherSafety, lockout);
            }
            None => {
                inner.lockouts.remove(&LockoutKind::WeatherSafety);
            }
        }

        let slope = weather::assess_slope(&inner.latest_orientation, &self.config.slope, now);
        match slope {
            Some(lockout) => {
                inner.lockouts.insert(LockoutKind::SlopeSafety, lockout);
            }
            None => {
                inner.lockouts.remove(&LockoutKind::SlopeSafety);
            }
        }

        if let Some(blade_wear) = inner.blade.assess(&self.config.blade, now) {
            if blade_wear.safety_concern {
                inner.lockouts.insert(
                    LockoutKind::BladeSafety,
                    MaintenanceLockout {
                        lockout_id: format!("blade_{}", now.monotonic_ns),
                        kind: LockoutKind::BladeSafety,
                        severity: sensor_types::LockoutSeverity::Blocking,
                        reason: format!("blade wear {:.1}% / vibration {:.2}g", blade_wear.wear_pct, blade_wear.vibration_g),
                        affected_subsystems: vec!["blade".to_string()],
                        created_at: now,
                        expires_at: None,
                        override_level: Some("technician".to_string()),
                    },
                );
            } else {
                inner.lockouts.remove(&LockoutKind::BladeSafety);
            }
        }

        inner.lockouts.values().cloned().collect()
    }

    pub async fn ingest_battery(&self, lockout: Option<MaintenanceLockout>) {
        let mut inner = self.inner.lock().await;
        match lockout {
            Some(l) => {
                inner.lockouts.insert(LockoutKind::BatterySafety, l);
            }
            None => {
                inner.lockouts.remove(&LockoutKind::BatterySafety);
            }
        }
    }

    pub async fn run(self: Arc<Self>, fabric: MessageFabric, clock: Clock) {
        let mut rx = fabric.subscribe("lawnberry.sensors.#").await;
        let supervisor = self.clone();
        let ingest_fabric = fabric.clone();
        let ingest_clock = clock.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                if let Ok(reading) = serde_json::from_str::<SensorReading>(&envelope.payload) {
                    if let SensorReading::Power(r) = &reading {
                        let now = ingest_clock.now();
                        let health = battery::assess(r, &supervisor.config.battery, now);
                        let _ = ingest_fabric.publish(topic::maintenance::BATTERY_HEALTH, &health).await;
                        let lockout = (!health.safety_concerns.is_empty()).then(|| MaintenanceLockout {
                            lockout_id: format!("battery_{}", now.monotonic_ns),
                            kind: LockoutKind::BatterySafety,
                            severity: sensor_types::LockoutSeverity::Blocking,
                            reason: health.safety_concerns.join(", "),
                            affected_subsystems: vec!["drive".to_string(), "blade".to_string()],
                            created_at: now,
                            expires_at: None,
                            override_level: None,
                        });
                        supervisor.ingest_battery(lockout).await;
                    }
                    supervisor.ingest(&reading, &ingest_clock).await;
                }
            }
        });

        let supervisor = self.clone();
        let tick_fabric = fabric.clone();
        let tick_clock = clock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            loop {
                interval.tick().await;
                let lockouts = supervisor.tick(&tick_clock).await;
                if let Some(wear) = supervisor.inner.lock().await.blade.assess(&supervisor.config.blade, tick_clock.now()) {
                    let _ = tick_fabric.publish(topic::maintenance::BLADE_WEAR, &wear).await;
                }
                if !lockouts.is_empty() {
                    warn!(count = lockouts.len(), "active maintenance lockouts");
                }
                let _ = tick_fabric.publish(topic::maintenance::LOCKOUTS, &lockouts).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_readings_yields_no_lockouts() {
        let supervisor = MaintenanceSupervisor::new(SafetyConfig::default());
        let clock = Clock::start();
        let lockouts = supervisor.tick(&clock).await;
        assert!(lockouts.is_empty());
    }
}
