//! `EmergencyState` — spec.md §3.

use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyActionId {
    StopMotors,
    DisableBlade,
    AlertAllSystems,
    SafePosition,
    SystemShutdown,
}

impl EmergencyActionId {
    pub fn priority(&self) -> u8 {
        match self {
            EmergencyActionId::StopMotors => 1,
            EmergencyActionId::DisableBlade => 1,
            EmergencyActionId::AlertAllSystems => 2,
            EmergencyActionId::SafePosition => 3,
            EmergencyActionId::SystemShutdown => 10,
        }
    }

    pub fn deadline_ms(&self) -> u64 {
        match self {
            EmergencyActionId::StopMotors => 50,
            EmergencyActionId::DisableBlade => 50,
            EmergencyActionId::AlertAllSystems => 100,
            EmergencyActionId::SafePosition => 200,
            EmergencyActionId::SystemShutdown => 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyActionOutcome {
    pub action: EmergencyActionId,
    pub dispatched_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub met_deadline: bool,
    pub consecutive_misses: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyState {
    pub active: bool,
    pub reason: String,
    pub triggered_at: Option<Timestamp>,
    pub acknowledged: bool,
    pub motors_confirmed_stopped: bool,
    pub blade_confirmed_disabled: bool,
    pub response_history: Vec<EmergencyActionOutcome>,
}

impl Default for EmergencyState {
    fn default() -> Self {
        Self {
            active: false,
            reason: String::new(),
            triggered_at: None,
            acknowledged: false,
            motors_confirmed_stopped: false,
            blade_confirmed_disabled: false,
            response_history: Vec::new(),
        }
    }
}
