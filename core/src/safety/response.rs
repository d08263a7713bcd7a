//! Graduated hazard response ladder (spec.md §4.5): an unresolved alert
//! at a rung escalates to the next rung after that rung's timeout. This
//! sits above the raw alert levels — a lingering `medium` alert becomes
//! more urgent the longer it goes unaddressed, independent of whether a
//! worse alert later arrives and is then cleared.

use sensor_types::{AlertLevel, Timestamp};

use crate::config::ResponseTimeouts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLevel {
    Nominal,
    Warning,
    Caution,
    ImmediateAction,
    EmergencyStop,
    SystemShutdown,
}

impl ResponseLevel {
    fn from_alert_level(level: AlertLevel) -> ResponseLevel {
        match level {
            AlertLevel::None => ResponseLevel::Nominal,
            AlertLevel::Low => ResponseLevel::Warning,
            AlertLevel::Medium => ResponseLevel::Caution,
            AlertLevel::High => ResponseLevel::ImmediateAction,
            AlertLevel::Critical => ResponseLevel::EmergencyStop,
        }
    }

    fn escalate(self) -> ResponseLevel {
        match self {
            ResponseLevel::Nominal => ResponseLevel::Nominal,
            ResponseLevel::Warning => ResponseLevel::Caution,
            ResponseLevel::Caution => ResponseLevel::ImmediateAction,
            ResponseLevel::ImmediateAction => ResponseLevel::EmergencyStop,
            ResponseLevel::EmergencyStop => ResponseLevel::SystemShutdown,
            ResponseLevel::SystemShutdown => ResponseLevel::SystemShutdown,
        }
    }

    fn timeout_s(self, timeouts: &ResponseTimeouts) -> Option<f64> {
        match self {
            ResponseLevel::Nominal => None,
            ResponseLevel::Warning => Some(timeouts.warning_s),
            ResponseLevel::Caution => Some(timeouts.caution_s),
            ResponseLevel::ImmediateAction => Some(timeouts.immediate_s),
            ResponseLevel::EmergencyStop => Some(timeouts.emergency_s),
            ResponseLevel::SystemShutdown => None,
        }
    }
}

pub struct ResponseLadder {
    level: ResponseLevel,
    entered_at: Option<Timestamp>,
}

impl Default for ResponseLadder {
    fn default() -> Self {
        Self { level: ResponseLevel::Nominal, entered_at: None }
    }
}

impl ResponseLadder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the worst currently-active alert level and the current time;
    /// returns the (possibly escalated) response level.
    pub fn update(&mut self, worst_active: AlertLevel, now: Timestamp, timeouts: &ResponseTimeouts) -> ResponseLevel {
        let demanded = ResponseLevel::from_alert_level(worst_active);

        if demanded > self.level {
            self.level = demanded;
            self.entered_at = Some(now);
        } else if demanded < self.level && demanded == ResponseLevel::Nominal {
            // Hazard cleared entirely: reset the ladder.
            self.level = ResponseLevel::Nominal;
            self.entered_at = None;
        }

        if let (Some(entered_at), Some(timeout_s)) = (self.entered_at, self.level.timeout_s(timeouts)) {
            let elapsed = now.elapsed_since(&entered_at).as_secs_f64();
            if elapsed > timeout_s {
                self.level = self.level.escalate();
                self.entered_at = Some(now);
            }
        }

        self.level
    }

    pub fn current(&self) -> ResponseLevel {
        self.level
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
    fn unresolved_caution_escalates_after_timeout() {
        let mut ladder = ResponseLadder::new();
        let timeouts = ResponseTimeouts { warning_s: 300.0, caution_s: 10.0, immediate_s: 30.0, emergency_s: 5.0 };
        let level = ladder.update(AlertLevel::Medium, ts(0), &timeouts);
        assert_eq!(level, ResponseLevel::Caution);
        let level = ladder.update(AlertLevel::Medium, ts(11), &timeouts);
        assert_eq!(level, ResponseLevel::ImmediateAction);
    }

    #[test]
    fn resolving_hazard_resets_ladder() {
        let mut ladder = ResponseLadder::new();
        let timeouts = ResponseTimeouts::default();
        ladder.update(AlertLevel::Critical, ts(0), &timeouts);
        let level = ladder.update(AlertLevel::None, ts(1), &timeouts);
        assert_eq!(level, ResponseLevel::Nominal);
    }

    #[test]
    fn worse_alert_immediately_escalates() {
        let mut ladder = ResponseLadder::new();
        let timeouts = ResponseTimeouts::default();
        ladder.update(AlertLevel::Low, ts(0), &timeouts);
        let level = ladder.update(AlertLevel::Critical, ts(1), &timeouts);
        assert_eq!(level, ResponseLevel::EmergencyStop);
    }
}
