//! GPS boundary and no-go zone enforcement, grounded in
//! `safety/boundary_monitor.py`'s `BoundaryMonitor`. Violations of the
//! same kind within a short hysteresis window are merged into one record
//! rather than spamming a fresh alert every tick; stale records are
//! evicted after `eviction_age_s`.

pub mod polygon;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use sensor_types::{
    topic, BoundaryPolygon, BoundaryViolation, BoundaryViolationKind, GeoPoint, GnssReading, NoGoZone, SensorReading,
    Timestamp,
};

use crate::clock::Clock;
use crate::config::BoundaryConfig;
use crate::fabric::MessageFabric;
use polygon::LocalPolygon;

struct LoadedZone {
    zone: NoGoZone,
    local: LocalPolygon,
}

struct Inner {
    yard_boundary: Option<(BoundaryPolygon, LocalPolygon)>,
    no_go_zones: HashMap<String, LoadedZone>,
    active_violations: HashMap<(BoundaryViolationKind, Option<String>), BoundaryViolation>,
    current_position: Option<GeoPoint>,
}

pub struct BoundaryMonitor {
    inner: Mutex<Inner>,
    config: BoundaryConfig,
}

/// Outcome of a boundary tick, fed to the safety supervisor.
pub struct BoundaryAssessment {
    pub safe: bool,
    pub signed_distance_m: f64,
    pub violations: Vec<BoundaryViolation>,
}

impl BoundaryMonitor {
    pub fn new(config: BoundaryConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                yard_boundary: None,
                no_go_zones: HashMap::new(),
                active_violations: HashMap::new(),
                current_position: None,
            }),
            config,
        }
    }

    pub async fn set_boundary(&self, boundary: BoundaryPolygon) {
        if !boundary.is_valid() {
            warn!(points = boundary.points.len(), "rejecting boundary with fewer than 3 points");
            return;
        }
        let local = LocalPolygon::from_geo(&boundary.points);
        let mut inner = self.inner.lock().await;
        info!(points = boundary.points.len(), "yard boundary loaded");
        inner.yard_boundary = Some((boundary, local));
    }

    pub async fn set_no_go_zone(&self, zone: NoGoZone) {
        if !zone.polygon.is_valid() {
            warn!(zone_id = %zone.zone_id, "rejecting no-go zone with fewer than 3 points");
            return;
        }
        let local = LocalPolygon::from_geo(&zone.polygon.points);
        let mut inner = self.inner.lock().await;
        info!(zone_id = %zone.zone_id, "no-go zone loaded");
        inner.no_go_zones.insert(zone.zone_id.clone(), LoadedZone { zone, local });
    }

    pub async fn ingest_position(&self, reading: &GnssReading) {
        if reading.horizontal_accuracy_m > self.config.accuracy_threshold_m {
            return;
        }
        self.inner.lock().await.current_position = Some(reading.position);
    }

    fn record_violation(
        active: &mut HashMap<(BoundaryViolationKind, Option<String>), BoundaryViolation>,
        kind: BoundaryViolationKind,
        zone_id: Option<String>,
        signed_distance_m: f64,
        now: Timestamp,
        hysteresis_window_s: f64,
    ) -> BoundaryViolation {
        let key = (kind, zone_id.clone());
        if let Some(existing) = active.get_mut(&key) {
            if now.elapsed_since(&existing.last_seen).as_secs_f64() <= hysteresis_window_s {
                existing.signed_distance_m = signed_distance_m;
                existing.last_seen = now;
                return existing.clone();
            }
        }
        let violation = BoundaryViolation {
            violation_id: format!("{kind:?}_{}", now.monotonic_ns),
            kind,
            signed_distance_m,
            zone_id,
            first_seen: now,
            last_seen: now,
        };
        active.insert(key, violation.clone());
        violation
    }

    pub async fn tick(&self, clock: &Clock) -> Option<BoundaryAssessment> {
        let now = clock.now();
        let mut inner = self.inner.lock().await;
        let position = inner.current_position?;

        inner.active_violations.retain(|_, v| !v.last_seen.is_older_than(&now, Duration::from_secs_f64(self.config.eviction_age_s)));
        for zone in inner.no_go_zones.values_mut() {
            if let Some(expiry) = zone.zone.expires_at {
                if now.elapsed_since(&expiry).as_secs_f64() > 0.0 {
                    zone.zone.active = false;
                }
            }
        }

        let mut violations = Vec::new();
        let mut signed_distance_m = f64::INFINITY;

        if let Some((polygon, local)) = &inner.yard_boundary {
            let origin = polygon.points[0];
            let distance = local.signed_distance(origin, position);
            signed_distance_m = distance;
            if distance < 0.0 {
                violations.push(Self::record_violation(
                    &mut inner.active_violations,
                    BoundaryViolationKind::BoundaryExit,
                    None,
                    distance,
                    now,
                    self.config.hysteresis_window_s,
                ));
            } else if distance < self.config.margin_m {
                violations.push(Self::record_violation(
                    &mut inner.active_violations,
                    BoundaryViolationKind::SafetyMargin,
                    None,
                    distance,
                    now,
                    self.config.hysteresis_window_s,
                ));
            }
        }

        let zone_ids: Vec<String> = inner.no_go_zones.keys().cloned().collect();
        for zone_id in zone_ids {
            let inside = {
                let zone = &inner.no_go_zones[&zone_id];
                if !zone.zone.active {
                    continue;
                }
                let origin = zone.zone.polygon.points[0];
                zone.local.contains(origin, position)
            };
            if inside {
                violations.push(Self::record_violation(
                    &mut inner.active_violations,
                    BoundaryViolationKind::NoGoEntry,
                    Some(zone_id),
                    0.0,
                    now,
                    self.config.hysteresis_window_s,
                ));
            }
        }

        let safe = !violations.iter().any(|v| matches!(v.kind, BoundaryViolationKind::NoGoEntry | BoundaryViolationKind::BoundaryExit));

        Some(BoundaryAssessment { safe, signed_distance_m, violations })
    }

    pub async fn run(self: Arc<Self>, fabric: MessageFabric, clock: Clock, safety: Option<Arc<crate::safety::SafetySupervisor>>) {
        let mut rx_gnss = fabric.subscribe(topic::sensors::GNSS).await;
        let monitor = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_gnss.recv().await {
                if let Ok(SensorReading::Gnss(r)) = serde_json::from_str::<SensorReading>(&envelope.payload) {
                    monitor.ingest_position(&r).await;
                }
            }
        });

        let monitor = self.clone();
        let tick_fabric = fabric.clone();
        let tick_clock = clock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if let Some(assessment) = monitor.tick(&tick_clock).await {
                    for violation in &assessment.violations {
                        let _ = tick_fabric.publish(topic::safety::BOUNDARY_VIOLATIONS, violation).await;
                    }
                    if let Some(safety) = &safety {
                        safety.ingest_boundary(assessment.safe, assessment.signed_distance_m).await;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> BoundaryPolygon {
        BoundaryPolygon {
            points: vec![
                GeoPoint { lat: 0.0, lon: 0.0 },
                GeoPoint { lat: 0.0, lon: 0.001 },
                GeoPoint { lat: 0.001, lon: 0.001 },
                GeoPoint { lat: 0.001, lon: 0.0 },
            ],
        }
    }

    fn gnss(position: GeoPoint, accuracy_m: f64) -> GnssReading {
        GnssReading {
            header: sensor_types::ReadingHeader {
                timestamp: Timestamp::new(0, chrono::Utc::now()),
                sensor_id: "gnss0".into(),
                quality: 1.0,
                port_or_bus_id: "i2c0".into(),
            },
            position,
            altitude: 0.0,
            horizontal_accuracy_m: accuracy_m,
            satellite_count: 12,
            fix_kind: sensor_types::FixKind::Rtk,
            hdop: 0.8,
            speed_mps: 0.0,
            rtk_status: None,
        }
    }

    #[tokio::test]
    async fn no_position_yields_no_assessment() {
        let monitor = BoundaryMonitor::new(BoundaryConfig::default());
        let clock = Clock::start();
        assert!(monitor.tick(&clock).await.is_none());
    }

    #[tokio::test]
    async fn inside_boundary_is_safe() {
        let monitor = BoundaryMonitor::new(BoundaryConfig::default());
        monitor.set_boundary(square()).await;
        monitor.ingest_position(&gnss(GeoPoint { lat: 0.0005, lon: 0.0005 }, 0.5)).await;
        let clock = Clock::start();
        let assessment = monitor.tick(&clock).await.unwrap();
        assert!(assessment.safe);
    }

    #[tokio::test]
    async fn outside_boundary_flags_violation() {
        let monitor = BoundaryMonitor::new(BoundaryConfig::default());
        monitor.set_boundary(square()).await;
        monitor.ingest_position(&gnss(GeoPoint { lat: -0.01, lon: -0.01 }, 0.5)).await;
        let clock = Clock::start();
        let assessment = monitor.tick(&clock).await.unwrap();
        assert!(!assessment.safe);
        assert_eq!(assessment.violations[0].kind, BoundaryViolationKind::BoundaryExit);
    }

    #[tokio::test]
    async fn low_accuracy_gps_is_ignored() {
        let monitor = BoundaryMonitor::new(BoundaryConfig::default());
        monitor.set_boundary(square()).await;
        monitor.ingest_position(&gnss(GeoPoint { lat: 0.0005, lon: 0.0005 }, 10.0)).await;
        let clock = Clock::start();
        assert!(monitor.tick(&clock).await.is_none());
    }
}
