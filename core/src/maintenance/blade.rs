//! Blade wear estimation from motor current, grounded in
//! `safety/maintenance_safety.py`'s `_analyze_blade_condition`. Motor
//! current draw above the sharp-blade baseline indicates dulling; a
//! 10-minute sliding window smooths single-sample noise.

use std::collections::VecDeque;
use std::time::Duration;

use sensor_types::{BladeCondition, BladeWear, Timestamp};

use crate::config::BladeConfig;

pub struct BladeMonitor {
    current_window: VecDeque<(Timestamp, f64)>,
    vibration_window: VecDeque<(Timestamp, f64)>,
    window: Duration,
}

impl BladeMonitor {
    pub fn new(config: &BladeConfig) -> Self {
        Self { current_window: VecDeque::new(), vibration_window: VecDeque::new(), window: Duration::from_secs_f64(config.window_minutes * 60.0) }
    }

    pub fn record_current(&mut self, current_a: f64, now: Timestamp) {
        self.current_window.push_back((now, current_a));
        while let Some(&(t, _)) = self.current_window.front() {
            if t.is_older_than(&now, self.window) {
                self.current_window.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn record_vibration(&mut self, vibration_g: f64, now: Timestamp) {
        self.vibration_window.push_back((now, vibration_g));
        while let Some(&(t, _)) = self.vibration_window.front() {
            if t.is_older_than(&now, self.window) {
                self.vibration_window.pop_front();
            } else {
                break;
            }
        }
        while self.vibration_window.len() > 10 {
            self.vibration_window.pop_front();
        }
    }

    /// `None` until at least 20 samples have accumulated, matching the
    /// original's minimum-sample-count gate.
    pub fn assess(&self, config: &BladeConfig, now: Timestamp) -> Option<BladeWear> {
        if self.current_window.len() < 20 {
            return None;
        }
        let currents: Vec<f64> = self.current_window.iter().map(|(_, c)| *c).collect();
        let avg_current = currents.iter().sum::<f64>() / currents.len() as f64;

        let baseline = config.baseline_current_a;
        let sharpness_score = (baseline / avg_current.max(0.1)).clamp(0.0, 1.0);
        let wear_pct = (((avg_current - baseline) / baseline) * 100.0).clamp(0.0, 100.0);

        let condition = if wear_pct > config.wear_critical_pct {
            BladeCondition::VeryDull
        } else if wear_pct > config.wear_attention_pct {
            BladeCondition::Dull
        } else if wear_pct < 10.0 {
            BladeCondition::Sharp
        } else {
            BladeCondition::SlightlyDull
        };

        let vibration_g = if self.vibration_window.is_empty() {
            0.0
        } else {
            self.vibration_window.iter().map(|(_, v)| *v).sum::<f64>() / self.vibration_window.len() as f64
        };

        let estimated_remaining_hours = if wear_pct > 0.0 { (100.0 - wear_pct) * 2.0 } else { 200.0 };
        let replacement_recommended = wear_pct > config.wear_attention_pct;
        let safety_concern = wear_pct > config.wear_critical_pct || vibration_g > config.vibration_threshold_g;

        Some(BladeWear {
            blade_id: "main_blade".to_string(),
            t: now,
            condition,
            sharpness_score,
            wear_pct,
            vibration_g,
            estimated_remaining_hours,
            replacement_recommended,
            safety_concern,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs * 1_000_000_000, Utc::now())
    }

    #[test]
    fn insufficient_samples_yields_none() {
        let config = BladeConfig::default();
        let monitor = BladeMonitor::new(&config);
        assert!(monitor.assess(&config, ts(0)).is_none());
    }

    #[test]
    fn elevated_current_flags_wear() {
        let config = BladeConfig::default();
        let mut monitor = BladeMonitor::new(&config);
        for i in 0..25 {
            monitor.record_current(4.5, ts(i));
        }
        let wear = monitor.assess(&config, ts(25)).unwrap();
        assert!(wear.wear_pct > 0.0);
        assert_eq!(wear.condition, BladeCondition::VeryDull);
        assert!(wear.safety_concern);
    }

    #[test]
    fn baseline_current_is_sharp() {
        let config = BladeConfig::default();
        let mut monitor = BladeMonitor::new(&config);
        for i in 0..25 {
            monitor.record_current(2.0, ts(i));
        }
        let wear = monitor.assess(&config, ts(25)).unwrap();
        assert_eq!(wear.condition, BladeCondition::Sharp);
        assert!(!wear.safety_concern);
    }
}
