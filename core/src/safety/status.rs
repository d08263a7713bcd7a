//! Alert de-duplication and `SafetyStatus` aggregation (spec.md §4.5).
//! Repeated alerts sharing a `(source, kind, level)` key are collapsed to
//! one active entry rather than flooding the fabric every tick.

use std::collections::HashMap;

use sensor_types::{AlertLevel, HazardAlert, MeasuredQuantities, SafetyAxisFlags, SafetyStatus, Timestamp};

pub struct AlertLedger {
    active: HashMap<(String, String, AlertLevel), HazardAlert>,
    window_s: f64,
}

impl AlertLedger {
    pub fn new(window_s: f64) -> Self {
        Self { active: HashMap::new(), window_s }
    }

    /// Record this tick's raw alerts from `source`, refreshing existing
    /// entries and evicting ones from `source` that didn't reappear.
    pub fn record(&mut self, source: &str, alerts: Vec<HazardAlert>, now: Timestamp) {
        self.active.retain(|(s, _, _), alert| {
            s != source || now.elapsed_since(&alert.t).as_secs_f64() <= self.window_s
        });
        for alert in alerts {
            let key = alert.dedup_key(source);
            self.active.insert(key, alert);
        }
    }

    pub fn active_alerts(&self) -> Vec<HazardAlert> {
        self.active.values().cloned().collect()
    }

    pub fn worst_level(&self) -> AlertLevel {
        self.active.values().map(|a| a.level).max().unwrap_or(AlertLevel::None)
    }
}

pub fn aggregate(
    t: Timestamp,
    flags: SafetyAxisFlags,
    measured: MeasuredQuantities,
    active_alerts: Vec<HazardAlert>,
    response_time_ms: f64,
) -> SafetyStatus {
    let level = active_alerts.iter().map(|a| a.level).max().unwrap_or(AlertLevel::None);
    let overall_safe = flags.all_safe() && level < AlertLevel::High;
    SafetyStatus { t, overall_safe, level, axis_flags: flags, measured, active_alerts, response_time_ms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sensor_types::RecommendedAction;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs * 1_000_000_000, Utc::now())
    }

    fn alert(kind: &str, level: AlertLevel, t: Timestamp) -> HazardAlert {
        HazardAlert {
            alert_id: format!("{kind}_{secs}", secs = t.monotonic_ns),
            kind: kind.to_string(),
            level,
            t,
            description: String::new(),
            location: None,
            sensor_context: Default::default(),
            recommended_action: RecommendedAction::Stop,
            immediate_response_required: false,
        }
    }

    #[test]
    fn repeated_alert_collapses_to_one() {
        let mut ledger = AlertLedger::new(5.0);
        ledger.record("tilt", vec![alert("tilt", AlertLevel::Medium, ts(0))], ts(0));
        ledger.record("tilt", vec![alert("tilt", AlertLevel::Medium, ts(1))], ts(1));
        assert_eq!(ledger.active_alerts().len(), 1);
    }

    #[test]
    fn stale_alert_from_source_is_evicted() {
        let mut ledger = AlertLedger::new(5.0);
        ledger.record("tilt", vec![alert("tilt", AlertLevel::Medium, ts(0))], ts(0));
        ledger.record("tilt", vec![], ts(10));
        assert!(ledger.active_alerts().is_empty());
    }

    #[test]
    fn overall_safe_false_when_high_alert_present() {
        let all_safe = SafetyAxisFlags {
            tilt_safe: true,
            drop_safe: true,
            collision_safe: true,
            weather_safe: true,
            boundary_safe: true,
        };
        let status = aggregate(
            ts(0),
            all_safe,
            MeasuredQuantities::default(),
            vec![alert("proximity", AlertLevel::High, ts(0))],
            2.0,
        );
        assert!(!status.overall_safe);
        assert!(status.invariant_holds());
    }
}
