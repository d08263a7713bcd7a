//! Localization engine: fuses GNSS/IMU/encoder readings into a 13-state
//! EKF pose estimate, publishing at the navigation rate (10Hz) and a
//! faster safety-pose shortcut (20Hz), per spec.md §4.3/§5. Grounded in
//! `sensor_fusion/localization.py`'s `LocalizationSystem`.

pub mod ekf;
pub mod projection;

use std::time::Duration;

use nalgebra::Vector3;
use tokio::sync::Mutex;
use tracing::{info, warn};

use sensor_types::{
    topic, EncoderStatusReading, FixKind, GnssReading, ImuReading, PoseEstimate, SensorReading,
};

use crate::clock::Clock;
use crate::fabric::MessageFabric;
use ekf::{EkfState, ProcessNoise};
use projection::Anchor;

/// GPS accuracy is never trusted below this floor (meters), matching the
/// source's `_gps_noise_position`.
const GPS_NOISE_FLOOR_M: f64 = 0.05;
const IMU_NOISE_RAD: f64 = 0.01;
/// Position-covariance trace (m²) above which the filter is considered
/// diverged and is re-anchored from the next RTK fix.
const DIVERGENCE_TRACE_M2: f64 = 400.0;

struct Inner {
    ekf: Option<EkfState>,
    anchor: Option<Anchor>,
    latest_gnss: Option<GnssReading>,
    latest_imu: Option<ImuReading>,
    latest_encoder: Option<EncoderStatusReading>,
    gnss_applied: bool,
    imu_applied: bool,
}

pub struct LocalizationEngine {
    inner: Mutex<Inner>,
    process_noise: ProcessNoise,
}

impl Default for LocalizationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalizationEngine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ekf: None,
                anchor: None,
                latest_gnss: None,
                latest_imu: None,
                latest_encoder: None,
                gnss_applied: false,
                imu_applied: false,
            }),
            process_noise: ProcessNoise::default(),
        }
    }

    /// Feed a validated sensor reading into the fusion state. Readings
    /// other than GNSS/IMU/encoder are ignored.
    pub async fn ingest(&self, reading: &SensorReading, clock: &Clock) {
        let mut inner = self.inner.lock().await;
        match reading {
            SensorReading::Gnss(r) => {
                if inner.anchor.is_none() && r.fix_kind == FixKind::Rtk {
                    info!(lat = r.position.lat, lon = r.position.lon, "anchoring local frame on first RTK fix");
                    inner.anchor = Some(Anchor::new(r.position, r.altitude));
                    inner.ekf = Some(EkfState::init(clock.now()));
                }
                inner.latest_gnss = Some(r.clone());
                inner.gnss_applied = false;
            }
            SensorReading::Imu(r) => {
                inner.latest_imu = Some(r.clone());
                inner.imu_applied = false;
            }
            SensorReading::EncoderStatus(r) => {
                inner.latest_encoder = Some(r.clone());
            }
            _ => {}
        }
    }

    /// Predict forward and apply any unconsumed measurements, returning
    /// the current pose if the filter has an anchor. `None` means the
    /// system is still awaiting its first RTK fix.
    pub async fn tick(&self, clock: &Clock) -> Option<PoseEstimate> {
        let mut inner = self.inner.lock().await;
        let anchor = inner.anchor?;

        let now = clock.now();
        let ekf = inner.ekf.as_mut()?;
        let dt = now.elapsed_since(&ekf.timestamp).as_secs_f64();
        ekf.predict(dt, &self.process_noise);
        ekf.timestamp = now;

        if !inner.gnss_applied {
            if let Some(gnss) = inner.latest_gnss.clone() {
                if matches!(gnss.fix_kind, FixKind::Fix3d | FixKind::Rtk) {
                    let local = anchor.to_local(gnss.position, gnss.altitude);
                    inner.ekf.as_mut().unwrap().update_position(local, gnss.horizontal_accuracy_m, GPS_NOISE_FLOOR_M);
                    inner.gnss_applied = true;
                }
            }
        }

        if !inner.imu_applied {
            if let Some(imu) = inner.latest_imu.clone() {
                let angular_velocity =
                    Vector3::new(imu.angular_velocity.x, imu.angular_velocity.y, imu.angular_velocity.z);
                inner.ekf.as_mut().unwrap().update_orientation(imu.quaternion, angular_velocity, IMU_NOISE_RAD);
                inner.imu_applied = true;
            }
        }

        let ekf = inner.ekf.as_ref().unwrap();
        if ekf.position_uncertainty_trace() > DIVERGENCE_TRACE_M2 {
            warn!(trace = ekf.position_uncertainty_trace(), "position covariance diverged, re-initializing");
            inner.ekf = Some(EkfState::init(now));
            inner.gnss_applied = false;
            inner.imu_applied = false;
            return None;
        }

        let ekf = inner.ekf.as_ref().unwrap();
        let (gps, gps_altitude) = anchor.to_geo(ekf.position());
        let imu_quality = inner.latest_imu.as_ref().map(|r| r.header.quality).unwrap_or(0.0);
        let gps_accuracy_m = inner.latest_gnss.as_ref().map(|r| r.horizontal_accuracy_m).unwrap_or(f64::INFINITY);

        let mut covariance = sensor_types::pose::zero_covariance6();
        let pcov = ekf.position_covariance();
        for i in 0..3 {
            for j in 0..3 {
                covariance[i][j] = pcov[(i, j)];
            }
        }

        let velocity = ekf.velocity();
        let angular_velocity = ekf.angular_velocity();

        Some(PoseEstimate {
            t: now,
            gps,
            gps_altitude,
            local: sensor_types::Vec3::new(ekf.position().x, ekf.position().y, ekf.position().z),
            quaternion: ekf.orientation(),
            linear_velocity: sensor_types::Vec3::new(velocity.x, velocity.y, velocity.z),
            angular_velocity: sensor_types::Vec3::new(angular_velocity.x, angular_velocity.y, angular_velocity.z),
            covariance,
            gps_accuracy_m,
            imu_quality,
            fusion_confidence: (imu_quality + if gps_accuracy_m.is_finite() { 1.0 } else { 0.3 }) / 2.0,
        })
    }

    /// Spawn the sensor-ingest subscriber plus the 10Hz navigation and
    /// 20Hz safety-pose publish loops.
    pub async fn run(self: std::sync::Arc<Self>, fabric: MessageFabric, clock: Clock) {
        let mut rx = fabric.subscribe("lawnberry.sensors.#").await;
        let engine = self.clone();
        let ingest_clock = clock.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let Ok(reading) = serde_json::from_str::<SensorReading>(&envelope.payload) else {
                    continue;
                };
                engine.ingest(&reading, &ingest_clock).await;
            }
        });

        let nav_engine = self.clone();
        let nav_fabric = fabric.clone();
        let nav_clock = clock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(100));
            loop {
                interval.tick().await;
                if let Some(pose) = nav_engine.tick(&nav_clock).await {
                    let _ = nav_fabric.publish(topic::navigation::POSE, &pose).await;
                }
            }
        });

        let safety_engine = self.clone();
        let safety_fabric = fabric.clone();
        let safety_clock = clock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(50));
            loop {
                interval.tick().await;
                if let Some(pose) = safety_engine.tick(&safety_clock).await {
                    let _ = safety_fabric.publish(topic::navigation::POSE_SAFETY, &pose).await;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_types::{CalibrationScore, GeoPoint, Quaternion, ReadingHeader, Vec3};

    fn header(clock: &Clock, sensor_id: &str) -> ReadingHeader {
        ReadingHeader { timestamp: clock.now(), sensor_id: sensor_id.into(), quality: 1.0, port_or_bus_id: "x".into() }
    }

    #[tokio::test]
    async fn awaiting_anchor_returns_none_before_rtk_fix() {
        let engine = LocalizationEngine::new();
        let clock = Clock::start();
        assert!(engine.tick(&clock).await.is_none());
    }

    #[tokio::test]
    async fn rtk_fix_anchors_and_produces_pose() {
        let engine = LocalizationEngine::new();
        let clock = Clock::start();
        let gnss = SensorReading::Gnss(GnssReading {
            header: header(&clock, "gnss0"),
            position: GeoPoint { lat: 40.0, lon: -105.0 },
            altitude: 1600.0,
            horizontal_accuracy_m: 0.02,
            satellite_count: 20,
            fix_kind: FixKind::Rtk,
            hdop: 0.7,
            speed_mps: 0.0,
            rtk_status: Some("fixed".into()),
        });
        engine.ingest(&gnss, &clock).await;
        let pose = engine.tick(&clock).await;
        assert!(pose.is_some());
        let pose = pose.unwrap();
        assert!((pose.gps.lat - 40.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn imu_update_keeps_quaternion_normalized() {
        let engine = LocalizationEngine::new();
        let clock = Clock::start();
        let gnss = SensorReading::Gnss(GnssReading {
            header: header(&clock, "gnss0"),
            position: GeoPoint { lat: 40.0, lon: -105.0 },
            altitude: 1600.0,
            horizontal_accuracy_m: 0.02,
            satellite_count: 20,
            fix_kind: FixKind::Rtk,
            hdop: 0.7,
            speed_mps: 0.0,
            rtk_status: Some("fixed".into()),
        });
        engine.ingest(&gnss, &clock).await;
        let imu = SensorReading::Imu(ImuReading {
            header: header(&clock, "imu0"),
            quaternion: Quaternion::new(0.98, 0.02, 0.0, 0.0),
            linear_acceleration: Vec3::new(0.0, 0.0, 9.81),
            angular_velocity: Vec3::ZERO,
            magnetic_field: None,
            calibration: CalibrationScore::High,
        });
        engine.ingest(&imu, &clock).await;
        let pose = engine.tick(&clock).await.unwrap();
        assert!(pose.quaternion.norm() > 0.99 && pose.quaternion.norm() < 1.01);
    }
}
