//! Emergency controller: software-based emergency stop without relying on
//! hardware interlocks, grounded in `safety/emergency_controller.py`.
//! Dispatches the priority action table, enforces the stop until motors
//! and blade confirm, and watches a system heartbeat that itself triggers
//! an emergency stop if it goes silent.

pub mod actions;
pub mod watchdog;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use serde::Deserialize;

use sensor_types::{topic, EmergencyActionId, EmergencyActionOutcome, EmergencyState, Timestamp};

#[derive(Deserialize)]
struct ByPayload {
    by: String,
}

use crate::clock::Clock;
use crate::config::EmergencyConfig;
use crate::fabric::MessageFabric;
use watchdog::Watchdog;

struct Inner {
    state: EmergencyState,
    consecutive_misses: std::collections::HashMap<EmergencyActionId, u32>,
    last_response_time_ms: f64,
}

pub struct EmergencyController {
    inner: Mutex<Inner>,
    watchdog: Watchdog,
    config: EmergencyConfig,
}

impl EmergencyController {
    pub fn new(config: EmergencyConfig, started_at: Timestamp) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: EmergencyState::default(),
                consecutive_misses: std::collections::HashMap::new(),
                last_response_time_ms: 0.0,
            }),
            watchdog: Watchdog::new(started_at, config.heartbeat_timeout_s),
            config,
        }
    }

    async fn dispatch_one(&self, fabric: &MessageFabric, action: EmergencyActionId, reason: &str, now: Timestamp) -> EmergencyActionOutcome {
        let payload = actions::payload_for(action, reason, now, false);
        let result = tokio::time::timeout(Duration::from_millis(action.deadline_ms()), fabric.publish(actions::topic_for(action), &payload)).await;
        let met_deadline = matches!(result, Ok(Ok(())));
        if !met_deadline {
            error!(action = ?action, "emergency action missed its deadline");
        }

        let mut inner = self.inner.lock().await;
        let misses = inner.consecutive_misses.entry(action).or_insert(0);
        if met_deadline {
            *misses = 0;
        } else {
            *misses += 1;
        }
        let consecutive_misses = *misses;
        if consecutive_misses >= self.config.max_consecutive_misses {
            warn!(action = ?action, consecutive_misses, "action missed deadline repeatedly, escalating");
        }

        EmergencyActionOutcome { action, dispatched_at: now, completed_at: met_deadline.then_some(now), met_deadline, consecutive_misses }
    }

    /// Execute the full emergency stop sequence: priority-1 actions
    /// concurrently, everything else in order after.
    pub async fn trigger(&self, fabric: &MessageFabric, clock: &Clock, reason: &str) -> bool {
        let start = clock.now();
        info!(reason, "executing emergency stop");

        {
            let mut inner = self.inner.lock().await;
            inner.state.active = true;
            inner.state.reason = reason.to_string();
            inner.state.triggered_at = Some(start);
            inner.state.acknowledged = false;
        }

        let (stop_motors, disable_blade) = tokio::join!(
            self.dispatch_one(fabric, EmergencyActionId::StopMotors, reason, start),
            self.dispatch_one(fabric, EmergencyActionId::DisableBlade, reason, start),
        );
        let mut outcomes = vec![stop_motors, disable_blade];

        let (_, deferred) = actions::priority_split();
        for action in deferred {
            outcomes.push(self.dispatch_one(fabric, action, reason, clock.now()).await);
        }

        let all_met = outcomes.iter().all(|o| o.met_deadline);
        let response_time_ms = clock.now().elapsed_since(&start).as_secs_f64() * 1000.0;

        {
            let mut inner = self.inner.lock().await;
            inner.state.motors_confirmed_stopped = inner.state.motors_confirmed_stopped || outcomes[0].met_deadline;
            inner.state.blade_confirmed_disabled = inner.state.blade_confirmed_disabled || outcomes[1].met_deadline;
            inner.state.response_history.extend(outcomes);
            if inner.state.response_history.len() > 64 {
                let excess = inner.state.response_history.len() - 64;
                inner.state.response_history.drain(0..excess);
            }
            inner.last_response_time_ms = response_time_ms;
        }

        let _ = fabric.publish(topic::emergency::STATE, &self.snapshot().await).await;
        all_met
    }

    pub async fn acknowledge(&self, by: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.state.active {
            return false;
        }
        inner.state.acknowledged = true;
        info!(by, "emergency acknowledged");
        true
    }

    pub async fn reset(&self, by: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.state.active || !inner.state.acknowledged {
            return false;
        }
        inner.state = EmergencyState::default();
        inner.consecutive_misses.clear();
        info!(by, "emergency state reset");
        true
    }

    pub async fn note_motor_status(&self, stopped: bool) {
        if stopped {
            self.inner.lock().await.state.motors_confirmed_stopped = true;
        }
    }

    pub async fn note_blade_status(&self, disabled: bool) {
        if disabled {
            self.inner.lock().await.state.blade_confirmed_disabled = true;
        }
    }

    pub async fn snapshot(&self) -> EmergencyState {
        self.inner.lock().await.state.clone()
    }

    async fn is_active(&self) -> bool {
        self.inner.lock().await.state.active
    }

    pub async fn run(self: Arc<Self>, fabric: MessageFabric, clock: Clock) {
        let mut rx_ack = fabric.subscribe(topic::emergency::ACKNOWLEDGE).await;
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_ack.recv().await {
                let by = serde_json::from_str::<ByPayload>(&envelope.payload).map(|p| p.by).unwrap_or_else(|_| "unknown".to_string());
                controller.acknowledge(&by).await;
            }
        });

        let mut rx_reset = fabric.subscribe(topic::emergency::RESET).await;
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_reset.recv().await {
                let by = serde_json::from_str::<ByPayload>(&envelope.payload).map(|p| p.by).unwrap_or_else(|_| "unknown".to_string());
                controller.reset(&by).await;
            }
        });

        let mut rx_heartbeat = fabric.subscribe(topic::system::HEARTBEAT).await;
        let controller = self.clone();
        let heartbeat_clock = clock.clone();
        tokio::spawn(async move {
            while rx_heartbeat.recv().await.is_some() {
                controller.watchdog.reset(heartbeat_clock.now()).await;
            }
        });

        let mut rx_motor = fabric.subscribe(topic::system::MOTORS_STATUS).await;
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_motor.recv().await {
                if let Ok(stopped) = serde_json::from_str::<bool>(&envelope.payload) {
                    controller.note_motor_status(stopped).await;
                }
            }
        });

        let mut rx_blade = fabric.subscribe(topic::system::BLADE_STATUS).await;
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx_blade.recv().await {
                if let Ok(disabled) = serde_json::from_str::<bool>(&envelope.payload) {
                    controller.note_blade_status(disabled).await;
                }
            }
        });

        let mut rx_stop = fabric.subscribe(topic::safety::EMERGENCY_STOP).await;
        let controller = self.clone();
        let trigger_fabric = fabric.clone();
        let trigger_clock = clock.clone();
        tokio::spawn(async move {
            while rx_stop.recv().await.is_some() {
                controller.trigger(&trigger_fabric, &trigger_clock, "safety supervisor critical alert").await;
            }
        });

        let enforcement_controller = self.clone();
        let enforcement_fabric = fabric.clone();
        let enforcement_clock = clock.clone();
        let enforcement_interval = Duration::from_secs_f64(self.config.enforcement_interval_s);
        let auto_timeout_s = self.config.auto_timeout_s;
        tokio::spawn(async move {
            // 1Hz enforcement loop: re-sends priority-1 actions until confirmed,
            // and auto-resets after `auto_timeout_s` if nobody ever acknowledges.
            let mut interval = tokio::time::interval(enforcement_interval);
            loop {
                interval.tick().await;
                if !enforcement_controller.is_active().await {
                    continue;
                }
                let now = enforcement_clock.now();
                let snapshot = enforcement_controller.snapshot().await;
                if !snapshot.motors_confirmed_stopped {
                    let payload = actions::payload_for(EmergencyActionId::StopMotors, &snapshot.reason, now, true);
                    let _ = enforcement_fabric.publish(actions::topic_for(EmergencyActionId::StopMotors), &payload).await;
                }
                if !snapshot.blade_confirmed_disabled {
                    let payload = actions::payload_for(EmergencyActionId::DisableBlade, &snapshot.reason, now, true);
                    let _ = enforcement_fabric.publish(actions::topic_for(EmergencyActionId::DisableBlade), &payload).await;
                }
                if let Some(triggered_at) = snapshot.triggered_at {
                    if !snapshot.acknowledged && now.elapsed_since(&triggered_at).as_secs_f64() > auto_timeout_s {
                        warn!("emergency state auto-timeout, resetting");
                        enforcement_controller.acknowledge("auto_timeout").await;
                        enforcement_controller.reset("auto_timeout").await;
                    }
                }
            }
        });

        let watchdog_controller = self.clone();
        let watchdog_fabric = fabric.clone();
        let watchdog_clock = clock.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                let now = watchdog_clock.now();
                if watchdog_controller.watchdog.is_expired(now).await {
                    error!("system heartbeat timeout detected");
                    watchdog_controller.trigger(&watchdog_fabric, &watchdog_clock, "heartbeat_timeout").await;
                    watchdog_controller.watchdog.reset(now).await;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs * 1_000_000_000, Utc::now())
    }

    #[tokio::test]
    async fn acknowledge_requires_active_emergency() {
        let controller = EmergencyController::new(EmergencyConfig::default(), ts(0));
        assert!(!controller.acknowledge("user").await);
    }

    #[tokio::test]
    async fn reset_requires_acknowledgement() {
        let controller = EmergencyController::new(EmergencyConfig::default(), ts(0));
        {
            let mut inner = controller.inner.lock().await;
            inner.state.active = true;
        }
        assert!(!controller.reset("user").await);
        controller.acknowledge("user").await;
        assert!(controller.reset("user").await);
    }
}
