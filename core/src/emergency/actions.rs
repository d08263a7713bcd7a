//! Priority-ordered emergency action table, grounded in
//! `safety/emergency_controller.py`'s `_initialize_emergency_actions`.
//! Priority-1 actions (stop motors, disable blade) dispatch concurrently
//! for the fastest possible response; everything else runs in priority
//! order afterward.

use serde::Serialize;

use sensor_types::{topic, EmergencyActionId, Timestamp};

pub const ALL_ACTIONS: [EmergencyActionId; 5] = [
    EmergencyActionId::StopMotors,
    EmergencyActionId::DisableBlade,
    EmergencyActionId::AlertAllSystems,
    EmergencyActionId::SafePosition,
    EmergencyActionId::SystemShutdown,
];

pub fn topic_for(action: EmergencyActionId) -> &'static str {
    match action {
        EmergencyActionId::StopMotors => topic::emergency::MOTORS_STOP,
        EmergencyActionId::DisableBlade => topic::emergency::BLADE_DISABLE,
        EmergencyActionId::AlertAllSystems => topic::emergency::ALERT_ALL,
        EmergencyActionId::SafePosition => topic::emergency::SAFE_POSITION,
        EmergencyActionId::SystemShutdown => topic::emergency::SHUTDOWN,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionPayload {
    pub command: &'static str,
    pub reason: String,
    pub t: Timestamp,
    pub enforce: bool,
}

pub fn payload_for(action: EmergencyActionId, reason: &str, now: Timestamp, enforce: bool) -> ActionPayload {
    let command = match action {
        EmergencyActionId::StopMotors => "emergency_stop",
        EmergencyActionId::DisableBlade => "disable",
        EmergencyActionId::AlertAllSystems => "alert",
        EmergencyActionId::SafePosition => "emergency_safe_position",
        EmergencyActionId::SystemShutdown => "emergency_shutdown",
    };
    ActionPayload { command, reason: reason.to_string(), t: now, enforce }
}

/// Ordered `(immediate, deferred)` split at priority 2, matching the
/// Python controller's concurrent-then-sequential execution split.
pub fn priority_split() -> (Vec<EmergencyActionId>, Vec<EmergencyActionId>) {
    let mut immediate = Vec::new();
    let mut deferred = Vec::new();
    for action in ALL_ACTIONS {
        if action.priority() <= 2 {
            immediate.push(action);
        } else {
            deferred.push(action);
        }
    }
    deferred.sort_by_key(|a| a.priority());
    (immediate, deferred)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_split_groups_motors_and_blade_together() {
        let (immediate, deferred) = priority_split();
        assert!(immediate.contains(&EmergencyActionId::StopMotors));
        assert!(immediate.contains(&EmergencyActionId::DisableBlade));
        assert_eq!(deferred.first(), Some(&EmergencyActionId::SafePosition));
        assert_eq!(deferred.last(), Some(&EmergencyActionId::SystemShutdown));
    }
}
