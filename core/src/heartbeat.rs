//! System heartbeat publisher: keeps `EmergencyController`'s watchdog
//! fed at a steady cadence, grounded in the same liveness-beacon role as
//! `uwb_hub::start_uwb_hub`'s periodic tag-presence broadcast.

use std::time::Duration;

use serde::Serialize;

use crate::clock::Clock;
use crate::fabric::MessageFabric;

const HEARTBEAT_HZ: f64 = 2.0;

#[derive(Serialize)]
struct Heartbeat {
    t: sensor_types::Timestamp,
}

pub async fn run(fabric: MessageFabric, clock: Clock) {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / HEARTBEAT_HZ));
    loop {
        interval.tick().await;
        let beat = Heartbeat { t: clock.now() };
        let _ = fabric.publish(sensor_types::topic::system::HEARTBEAT, &beat).await;
    }
}
