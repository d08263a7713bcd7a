//! In-process message fabric: publish/subscribe over dot-separated topics
//! with MQTT-flavored semantics (QoS hint, retained flag, wildcard
//! subscriptions, per-topic rate limiting, bounded back-pressure queues).
//!
//! Grounded in the source's `communication/client.py` (`MQTTClient`) and
//! `communication/topic_manager.py` (`TopicManager`), reshaped around an
//! in-process broadcast instead of a network broker: spec.md §2 scopes the
//! external MQTT/WS bridge out, but every subsystem in this process still
//! talks through the same publish/subscribe/request vocabulary.

pub mod codec;
pub mod topic;

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::FabricConfig;
use crate::error::FabricError;
use sensor_types::Timestamp;

/// A decoded message as delivered to subscribers. `payload` is JSON text;
/// call sites deserialize into the type they expect for the topic.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retained: bool,
    pub reply_to: Option<String>,
    pub correlation_id: Option<Uuid>,
    pub published_at: Timestamp,
}

/// Static routing policy for a topic pattern, mirroring `TopicDefinition`.
#[derive(Debug, Clone)]
pub struct TopicPolicy {
    pub pattern: &'static str,
    pub qos: u8,
    pub retained: bool,
    /// Messages per minute, `None` means unlimited.
    pub rate_limit_per_min: Option<u32>,
    /// Rate limiting never applies to these topics regardless of load —
    /// safety and emergency traffic must never be throttled.
    pub critical: bool,
}

const POLICY_TABLE: &[TopicPolicy] = &[
    TopicPolicy { pattern: "lawnberry.sensors.+.data", qos: 1, retained: false, rate_limit_per_min: Some(600), critical: false },
    TopicPolicy { pattern: "lawnberry.sensors.+.status", qos: 1, retained: true, rate_limit_per_min: Some(20), critical: false },
    TopicPolicy { pattern: "lawnberry.vision.detections", qos: 1, retained: false, rate_limit_per_min: Some(30), critical: false },
    TopicPolicy { pattern: "lawnberry.navigation.pose", qos: 1, retained: true, rate_limit_per_min: Some(200), critical: false },
    TopicPolicy { pattern: "lawnberry.navigation.status", qos: 1, retained: true, rate_limit_per_min: Some(5), critical: false },
    TopicPolicy { pattern: "lawnberry.safety.alerts.#", qos: 2, retained: true, rate_limit_per_min: None, critical: true },
    TopicPolicy { pattern: "lawnberry.safety.status", qos: 1, retained: true, rate_limit_per_min: Some(120), critical: false },
    TopicPolicy { pattern: "lawnberry.safety.boundary.#", qos: 1, retained: true, rate_limit_per_min: Some(60), critical: false },
    TopicPolicy { pattern: "lawnberry.emergency.#", qos: 2, retained: true, rate_limit_per_min: None, critical: true },
    TopicPolicy { pattern: "lawnberry.maintenance.#", qos: 1, retained: true, rate_limit_per_min: Some(20), critical: false },
    TopicPolicy { pattern: "lawnberry.system.#", qos: 1, retained: true, rate_limit_per_min: Some(60), critical: false },
];

fn policy_for(topic: &str) -> TopicPolicy {
    for entry in POLICY_TABLE {
        if self::topic::matches(entry.pattern, topic) {
            return entry.clone();
        }
    }
    TopicPolicy { pattern: "", qos: 1, retained: false, rate_limit_per_min: None, critical: false }
}

struct Subscription {
    pattern: String,
    sender: mpsc::Sender<Envelope>,
}

/// The process-wide publish/subscribe hub. Cheap to clone (wraps an `Arc`).
#[derive(Clone)]
pub struct MessageFabric {
    inner: Arc<Inner>,
}

struct Inner {
    clock: Clock,
    queue_size: usize,
    subscribers: RwLock<Vec<Subscription>>,
    retained: RwLock<HashMap<String, Envelope>>,
    rate_windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    pending_requests: Mutex<HashMap<Uuid, oneshot::Sender<Envelope>>>,
    dropped_total: AtomicU64,
    rate_limited_total: AtomicU64,
}

impl MessageFabric {
    pub fn new(clock: Clock, config: &FabricConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                queue_size: config.queue_size.unwrap_or(1000),
                subscribers: RwLock::new(Vec::new()),
                retained: RwLock::new(HashMap::new()),
                rate_windows: Mutex::new(HashMap::new()),
                pending_requests: Mutex::new(HashMap::new()),
                dropped_total: AtomicU64::new(0),
                rate_limited_total: AtomicU64::new(0),
            }),
        }
    }

    /// Routing policy that would apply to a concrete topic (not a
    /// pattern), for diagnostics and tests.
    pub fn topic_policy(&self, topic: &str) -> TopicPolicy {
        policy_for(topic)
    }

    /// Subscribe to a topic pattern (may contain `+`/`#` wildcards).
    /// Any currently-retained message matching the pattern is delivered
    /// immediately to the new subscriber.
    pub async fn subscribe(&self, pattern: &str) -> mpsc::Receiver<Envelope> {
        let (tx, rx) = mpsc::channel(self.inner.queue_size);
        {
            let retained = self.inner.retained.read().await;
            for envelope in retained.values() {
                if self::topic::matches(pattern, &envelope.topic) {
                    let _ = tx.try_send(envelope.clone());
                }
            }
        }
        self.inner.subscribers.write().await.push(Subscription { pattern: pattern.to_string(), sender: tx });
        rx
    }

    /// Publish a JSON-serializable value to `topic`. Applies the policy
    /// table's QoS/retain/rate-limit for the topic automatically.
    pub async fn publish<T: Serialize>(&self, topic: &str, value: &T) -> Result<(), FabricError> {
        let payload = codec::encode(value).map_err(FabricError::Codec)?;
        self.publish_raw(topic, payload, None, None).await
    }

    async fn publish_raw(
        &self,
        topic: &str,
        payload: String,
        reply_to: Option<String>,
        correlation_id: Option<Uuid>,
    ) -> Result<(), FabricError> {
        let policy = policy_for(topic);

        if !policy.critical {
            if let Some(limit) = policy.rate_limit_per_min {
                if !self.check_rate_limit(topic, limit).await {
                    self.inner.rate_limited_total.fetch_add(1, Ordering::Relaxed);
                    warn!(topic, "rate limit exceeded, dropping publish");
                    return Err(FabricError::RateLimited(topic.to_string()));
                }
            }
        }

        let envelope = Envelope {
            topic: topic.to_string(),
            payload,
            qos: policy.qos,
            retained: policy.retained,
            reply_to,
            correlation_id,
            published_at: self.inner.clock.now(),
        };

        if policy.retained {
            self.inner.retained.write().await.insert(topic.to_string(), envelope.clone());
        }

        if let Some(correlation_id) = envelope.correlation_id {
            if envelope.reply_to.is_none() {
                let mut pending = self.inner.pending_requests.lock().await;
                if let Some(sender) = pending.remove(&correlation_id) {
                    let _ = sender.send(envelope.clone());
                }
            }
        }

        let subscribers = self.inner.subscribers.read().await;
        for sub in subscribers.iter() {
            if self::topic::matches(&sub.pattern, topic) {
                match sub.sender.try_send(envelope.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        self.inner.dropped_total.fetch_add(1, Ordering::Relaxed);
                        warn!(topic, pattern = sub.pattern, "subscriber queue full, dropping message");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {}
                }
            }
        }
        debug!(topic, qos = policy.qos, "published");
        Ok(())
    }

    async fn check_rate_limit(&self, topic: &str, limit_per_min: u32) -> bool {
        let mut windows = self.inner.rate_windows.lock().await;
        let window = windows.entry(topic.to_string()).or_default();
        let now = Instant::now();
        let minute_ago = now - Duration::from_secs(60);
        while let Some(front) = window.front() {
            if *front < minute_ago {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() as u32 >= limit_per_min {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Request/response over the fabric: publishes `value` to `topic` with
    /// a unique reply address, then waits up to `timeout` for a handler
    /// registered via [`register_request_handler`] to answer.
    pub async fn request<T: Serialize>(
        &self,
        topic: &str,
        value: &T,
        timeout: Duration,
    ) -> Result<Envelope, FabricError> {
        let correlation_id = Uuid::new_v4();
        let reply_topic = format!("lawnberry.rpc.reply.{correlation_id}");
        let payload = codec::encode(value).map_err(FabricError::Codec)?;

        let (tx, rx) = oneshot::channel();
        self.inner.pending_requests.lock().await.insert(correlation_id, tx);

        self.publish_raw(topic, payload, Some(reply_topic), Some(correlation_id)).await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(envelope)) => Ok(envelope),
            _ => {
                self.inner.pending_requests.lock().await.remove(&correlation_id);
                Err(FabricError::Timeout(topic.to_string()))
            }
        }
    }

    /// Register a handler for request-response traffic on `topic`. The
    /// handler is driven by a background task for the lifetime of the
    /// fabric; a dropped `MessageFabric` clone does not stop it — shut it
    /// down by dropping every clone.
    pub async fn register_request_handler<F, Fut>(&self, topic: &str, handler: F)
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = String> + Send + 'static,
    {
        let mut rx = self.subscribe(topic).await;
        let fabric = self.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let Some(reply_to) = envelope.correlation_id.zip(envelope.reply_to.clone()) else {
                    continue;
                };
                let (correlation_id, reply_to) = reply_to;
                let response = handler(envelope).await;
                let _ = fabric.publish_raw(&reply_to, response, None, Some(correlation_id)).await;
            }
        });
    }

    pub fn dropped_total(&self) -> u64 {
        self.inner.dropped_total.load(Ordering::Relaxed)
    }

    pub fn rate_limited_total(&self) -> u64 {
        self.inner.rate_limited_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FabricConfig;

    fn test_fabric() -> MessageFabric {
        MessageFabric::new(Clock::start(), &FabricConfig { queue_size: Some(8) })
    }

    #[tokio::test]
    async fn publish_reaches_matching_subscriber() {
        let fabric = test_fabric();
        let mut rx = fabric.subscribe("lawnberry.sensors.+.data").await;
        fabric.publish("lawnberry.sensors.gnss.data", &serde_json::json!({"x": 1})).await.unwrap();
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.topic, "lawnberry.sensors.gnss.data");
    }

    #[tokio::test]
    async fn retained_message_replays_to_late_subscriber() {
        let fabric = test_fabric();
        fabric.publish("lawnberry.navigation.status", &serde_json::json!({"ok": true})).await.unwrap();
        let mut rx = fabric.subscribe("lawnberry.navigation.status").await;
        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.topic, "lawnberry.navigation.status");
    }

    #[tokio::test]
    async fn rate_limit_drops_excess_publishes() {
        let fabric = test_fabric();
        // navigation.status policy allows 5/min.
        for _ in 0..5 {
            fabric.publish("lawnberry.navigation.status", &serde_json::json!({})).await.unwrap();
        }
        let result = fabric.publish("lawnberry.navigation.status", &serde_json::json!({})).await;
        assert!(matches!(result, Err(FabricError::RateLimited(_))));
    }

    #[tokio::test]
    async fn critical_topics_bypass_rate_limit() {
        let fabric = test_fabric();
        for _ in 0..50 {
            fabric.publish("lawnberry.emergency.trigger", &serde_json::json!({})).await.unwrap();
        }
    }

    #[tokio::test]
    async fn request_response_round_trip() {
        let fabric = test_fabric();
        fabric
            .register_request_handler("lawnberry.system.ping", |envelope| async move {
                format!("pong:{}", envelope.payload)
            })
            .await;
        let response = fabric
            .request("lawnberry.system.ping", &serde_json::json!("hi"), Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(response.payload, "pong:\"hi\"");
    }

    #[tokio::test]
    async fn request_without_handler_times_out() {
        let fabric = test_fabric();
        let result = fabric
            .request("lawnberry.system.unhandled", &serde_json::json!({}), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(FabricError::Timeout(_))));
    }
}
