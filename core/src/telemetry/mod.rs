//! System-wide telemetry rollup: subscribes to the status topics every
//! other subsystem already publishes and republishes a single merged
//! `TelemetrySnapshot` at the platform's cadence contract
//! (`DeviceModel::telemetry_publish_hz`), plus the `/health` endpoint
//! (`health.rs`). Grounded in `backend/src/api/routes/telemetry.py`'s
//! aggregation of per-subsystem state into one dashboard payload.

pub mod health;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use sensor_types::{
    topic, EmergencyState, MaintenanceLockout, ObstacleMap, ObstacleMapSummary, PoseEstimate,
    SafetyAxisFlags, SafetyStatus, ThreatLevel, TelemetrySnapshot,
};

use crate::clock::Clock;
use crate::fabric::MessageFabric;
use crate::safety::status;

struct Inner {
    safety: Option<SafetyStatus>,
    emergency: Option<EmergencyState>,
    obstacles: Option<ObstacleMap>,
    lockouts: Vec<MaintenanceLockout>,
    pose: Option<PoseEstimate>,
}

pub struct TelemetryAggregator {
    inner: Mutex<Inner>,
    started_at: sensor_types::Timestamp,
    publish_hz: f64,
}

impl TelemetryAggregator {
    pub fn new(started_at: sensor_types::Timestamp, publish_hz: f64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                safety: None,
                emergency: None,
                obstacles: None,
                lockouts: Vec::new(),
                pose: None,
            }),
            started_at,
            publish_hz,
        }
    }

    pub async fn snapshot(&self, clock: &Clock) -> TelemetrySnapshot {
        let now = clock.now();
        let inner = self.inner.lock().await;
        let safety = inner.safety.clone().unwrap_or_else(|| {
            status::aggregate(
                now,
                SafetyAxisFlags { tilt_safe: true, drop_safe: true, collision_safe: true, weather_safe: true, boundary_safe: true },
                Default::default(),
                Vec::new(),
                0.0,
            )
        });
        let obstacles = inner.obstacles.as_ref().map(|m| m.summary.clone()).unwrap_or(ObstacleMapSummary {
            total: 0,
            by_kind: Default::default(),
            max_threat: ThreatLevel::None,
        });
        TelemetrySnapshot {
            t: now,
            uptime_s: now.elapsed_since(&self.started_at).as_secs_f64(),
            pose: inner.pose.clone(),
            safety,
            emergency: inner.emergency.clone().unwrap_or_default(),
            obstacles,
            lockouts: inner.lockouts.clone(),
        }
    }

    pub async fn run(self: Arc<Self>, fabric: MessageFabric, clock: Clock) {
        let mut rx_safety = fabric.subscribe(topic::safety::STATUS).await;
        let agg = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_safety.recv().await {
                if let Ok(status) = serde_json::from_str::<SafetyStatus>(&envelope.payload) {
                    agg.inner.lock().await.safety = Some(status);
                }
            }
        });

        let mut rx_emergency = fabric.subscribe(topic::emergency::STATE).await;
        let agg = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_emergency.recv().await {
                if let Ok(state) = serde_json::from_str::<EmergencyState>(&envelope.payload) {
                    agg.inner.lock().await.emergency = Some(state);
                }
            }
        });

        let mut rx_obstacles = fabric.subscribe(topic::safety::OBSTACLES).await;
        let agg = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_obstacles.recv().await {
                if let Ok(map) = serde_json::from_str::<ObstacleMap>(&envelope.payload) {
                    agg.inner.lock().await.obstacles = Some(map);
                }
            }
        });

        let mut rx_lockouts = fabric.subscribe(topic::maintenance::LOCKOUTS).await;
        let agg = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_lockouts.recv().await {
                if let Ok(lockouts) = serde_json::from_str::<Vec<MaintenanceLockout>>(&envelope.payload) {
                    agg.inner.lock().await.lockouts = lockouts;
                }
            }
        });

        let mut rx_pose = fabric.subscribe(topic::navigation::POSE).await;
        let agg = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_pose.recv().await {
                if let Ok(pose) = serde_json::from_str::<PoseEstimate>(&envelope.payload) {
                    agg.inner.lock().await.pose = Some(pose);
                }
            }
        });

        let agg = self.clone();
        let publish_fabric = fabric.clone();
        let publish_clock = clock.clone();
        tokio::spawn(async move {
            let period = Duration::from_secs_f64(1.0 / agg.publish_hz.max(0.1));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let snapshot = agg.snapshot(&publish_clock).await;
                let _ = publish_fabric.publish(topic::system::TELEMETRY, &snapshot).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sensor_types::Timestamp;

    #[tokio::test]
    async fn snapshot_defaults_to_nominal_before_any_inputs() {
        let clock = Clock::start();
        let aggregator = TelemetryAggregator::new(Timestamp::new(0, Utc::now()), 5.0);
        let snapshot = aggregator.snapshot(&clock).await;
        assert_eq!(snapshot.obstacles.total, 0);
        assert!(snapshot.lockouts.is_empty());
    }
}
