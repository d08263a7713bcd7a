//! The single process clock (spec.md §3): a monotonic instant anchor plus
//! the wall-clock mapping used for external reporting. Constructed once in
//! `main` and cloned into every subsystem — there is no lazy global here,
//! per spec.md §9's ban on global singletons.

use std::time::Instant;

use chrono::{DateTime, Utc};
use sensor_types::Timestamp;

#[derive(Clone)]
pub struct Clock {
    anchor_instant: Instant,
    anchor_wall: DateTime<Utc>,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            anchor_instant: Instant::now(),
            anchor_wall: Utc::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        let elapsed = self.anchor_instant.elapsed();
        let wall = self.anchor_wall + chrono::Duration::from_std(elapsed).unwrap_or_default();
        Timestamp::new(elapsed.as_nanos() as u64, wall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic() {
        let clock = Clock::start();
        let a = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = clock.now();
        assert!(b.monotonic_ns > a.monotonic_ns);
    }
}
