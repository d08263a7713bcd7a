//! System heartbeat watchdog, grounded in
//! `safety/emergency_controller.py`'s `_watchdog_loop`.

use tokio::sync::Mutex;

use sensor_types::Timestamp;

pub struct Watchdog {
    last_heartbeat: Mutex<Timestamp>,
    timeout_s: f64,
}

impl Watchdog {
    pub fn new(started_at: Timestamp, timeout_s: f64) -> Self {
        Self { last_heartbeat: Mutex::new(started_at), timeout_s }
    }

    pub async fn reset(&self, now: Timestamp) {
        *self.last_heartbeat.lock().await = now;
    }

    pub async fn is_expired(&self, now: Timestamp) -> bool {
        let last = *self.last_heartbeat.lock().await;
        now.elapsed_since(&last).as_secs_f64() > self.timeout_s
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
    async fn expires_after_timeout() {
        let watchdog = Watchdog::new(ts(0), 10.0);
        assert!(!watchdog.is_expired(ts(5)).await);
        assert!(watchdog.is_expired(ts(11)).await);
    }

    #[tokio::test]
    async fn reset_delays_expiry() {
        let watchdog = Watchdog::new(ts(0), 10.0);
        watchdog.reset(ts(8)).await;
        assert!(!watchdog.is_expired(ts(15)).await);
    }
}
