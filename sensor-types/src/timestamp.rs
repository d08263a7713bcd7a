//! Wire-level timestamp: a monotonic instant (nanoseconds since the
//! process's clock epoch) plus the wall-clock mapping used for external
//! reporting, per spec.md §3. The monotonic clock itself lives in
//! `core::clock` (a single process-wide instance); this type is the
//! serializable snapshot stamped onto every reading and published payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Nanoseconds since process start, from the single monotonic clock.
    pub monotonic_ns: u64,
    /// Wall-clock mapping, serialized as ISO-8601 UTC.
    pub wall: DateTime<Utc>,
}

impl Timestamp {
    pub fn new(monotonic_ns: u64, wall: DateTime<Utc>) -> Self {
        Self { monotonic_ns, wall }
    }

    pub fn elapsed_since(&self, earlier: &Timestamp) -> std::time::Duration {
        std::time::Duration::from_nanos(self.monotonic_ns.saturating_sub(earlier.monotonic_ns))
    }

    pub fn is_older_than(&self, reference: &Timestamp, age: std::time::Duration) -> bool {
        reference.monotonic_ns.saturating_sub(self.monotonic_ns) > age.as_nanos() as u64
    }
}
