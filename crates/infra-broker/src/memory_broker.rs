// In-Process Message Broker
//
// Topic exchanges with `*`/`#` segment matching, per-queue dead-letter
// targets, delivery tags, unacked tracking and a redelivery limit. Supplies
// the contractual queue/exchange semantics while the network broker stays
// an external collaborator.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, warn};

use lwgs_core::domain::MessageHeaders;
use lwgs_core::error::{AppError, Result};
use lwgs_core::port::{Delivery, MessageBroker};

const DEFAULT_DELIVERY_LIMIT: u32 = 3;

struct Binding {
    pattern: String,
    queue: String,
}

struct QueuedMessage {
    delivery: Delivery,
    attempts: u32,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<QueuedMessage>,
    unacked: HashMap<u64, QueuedMessage>,
    dead_letter: Option<String>,
}

#[derive(Default)]
struct BrokerInner {
    exchanges: HashMap<String, Vec<Binding>>,
    queues: HashMap<String, QueueState>,
    next_tag: u64,
}

pub struct InMemoryBroker {
    inner: Mutex<BrokerInner>,
    delivery_limit: u32,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BrokerInner::default()),
            delivery_limit: DEFAULT_DELIVERY_LIMIT,
        }
    }

    /// Maximum times a message is delivered before it is dead-lettered
    /// (or dropped when the queue has no dead-letter target)
    pub fn with_delivery_limit(mut self, limit: u32) -> Self {
        self.delivery_limit = limit.max(1);
        self
    }

    pub fn declare_exchange(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.exchanges.entry(name.to_string()).or_default();
    }

    pub fn declare_queue(&self, name: &str, dead_letter: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();
        let queue = inner.queues.entry(name.to_string()).or_default();
        queue.dead_letter = dead_letter.map(str::to_string);
    }

    pub fn bind(&self, exchange: &str, pattern: &str, queue: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.queues.contains_key(queue) {
            return Err(AppError::Broker(format!("unknown queue {}", queue)));
        }
        let bindings = inner
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| AppError::Broker(format!("unknown exchange {}", exchange)))?;
        bindings.push(Binding {
            pattern: pattern.to_string(),
            queue: queue.to_string(),
        });
        Ok(())
    }

    /// AMQP topic matching over dot-separated segments: `*` matches exactly
    /// one segment, `#` matches any (possibly empty) tail.
    fn topic_matches(pattern: &str, topic: &str) -> bool {
        fn matches(pattern: &[&str], topic: &[&str]) -> bool {
            match (pattern.split_first(), topic.split_first()) {
                (None, None) => true,
                (Some((&"#", rest)), _) => {
                    matches(rest, topic)
                        || (!topic.is_empty() && matches(pattern, &topic[1..]))
                }
                (Some((&"*", p_rest)), Some((_, t_rest))) => matches(p_rest, t_rest),
                (Some((p, p_rest)), Some((t, t_rest))) => p == t && matches(p_rest, t_rest),
                _ => false,
            }
        }
        let pattern: Vec<&str> = pattern.split('.').collect();
        let topic: Vec<&str> = topic.split('.').collect();
        matches(&pattern, &topic)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish(
        &self,
        exchange: &str,
        topic: &str,
        payload: Vec<u8>,
        headers: &MessageHeaders,
    ) -> Result<()> {
        let header_map = headers.to_map();
        let correlation_id = headers.correlation_id();

        let mut inner = self.inner.lock().unwrap();
        let bindings = inner
            .exchanges
            .get(exchange)
            .ok_or_else(|| AppError::Broker(format!("unknown exchange {}", exchange)))?;

        let targets: Vec<String> = bindings
            .iter()
            .filter(|b| Self::topic_matches(&b.pattern, topic))
            .map(|b| b.queue.clone())
            .collect();

        if targets.is_empty() {
            // Unroutable messages are dropped, as a topic exchange does
            debug!(exchange = %exchange, topic = %topic, "No binding matched, dropping publish");
            return Ok(());
        }

        for queue_name in targets {
            inner.next_tag += 1;
            let delivery = Delivery {
                headers: header_map.clone(),
                payload: payload.clone(),
                correlation_id: correlation_id.clone(),
                delivery_tag: inner.next_tag,
                redelivered: false,
            };
            if let Some(queue) = inner.queues.get_mut(&queue_name) {
                queue.ready.push_back(QueuedMessage {
                    delivery,
                    attempts: 0,
                });
            }
        }
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<Delivery>> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .queues
            .get_mut(queue)
            .ok_or_else(|| AppError::Broker(format!("unknown queue {}", queue)))?;

        let Some(mut message) = state.ready.pop_front() else {
            return Ok(None);
        };
        message.delivery.redelivered = message.attempts > 0;
        let delivery = message.delivery.clone();
        state.unacked.insert(delivery.delivery_tag, message);
        Ok(Some(delivery))
    }

    async fn ack(&self, queue: &str, delivery_tag: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .queues
            .get_mut(queue)
            .ok_or_else(|| AppError::Broker(format!("unknown queue {}", queue)))?;
        if state.unacked.remove(&delivery_tag).is_none() {
            debug!(queue = %queue, delivery_tag, "Ack for unknown delivery tag");
        }
        Ok(())
    }

    async fn nack(&self, queue: &str, delivery_tag: u64, requeue: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .queues
            .get_mut(queue)
            .ok_or_else(|| AppError::Broker(format!("unknown queue {}", queue)))?;
        let Some(mut message) = state.unacked.remove(&delivery_tag) else {
            debug!(queue = %queue, delivery_tag, "Nack for unknown delivery tag");
            return Ok(());
        };

        message.attempts += 1;
        if requeue && message.attempts < self.delivery_limit {
            state.ready.push_front(message);
            return Ok(());
        }

        let dead_letter = state.dead_letter.clone();
        match dead_letter {
            Some(dlq) => {
                warn!(queue = %queue, dlq = %dlq, delivery_tag, "Dead-lettering delivery");
                inner.next_tag += 1;
                let tag = inner.next_tag;
                if let Some(target) = inner.queues.get_mut(&dlq) {
                    message.delivery.delivery_tag = tag;
                    message.attempts = 0;
                    target.ready.push_back(message);
                }
            }
            None => {
                warn!(queue = %queue, delivery_tag, "Dropping delivery (no dead-letter target)");
            }
        }
        Ok(())
    }

    async fn queue_count(&self, queue: &str) -> Result<u64> {
        let inner = self.inner.lock().unwrap();
        let state = inner
            .queues
            .get(queue)
            .ok_or_else(|| AppError::Broker(format!("unknown queue {}", queue)))?;
        Ok(state.ready.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> MessageHeaders {
        MessageHeaders::builder()
            .sender_id("S1")
            .transaction_id("t1")
            .timestamp(1000)
            .build()
    }

    fn broker_with_queue(queue: &str) -> InMemoryBroker {
        let broker = InMemoryBroker::new();
        broker.declare_exchange("ex");
        broker.declare_queue(queue, None);
        broker.bind("ex", queue, queue).unwrap();
        broker
    }

    #[test]
    fn test_topic_matching() {
        assert!(InMemoryBroker::topic_matches("a.b.c", "a.b.c"));
        assert!(!InMemoryBroker::topic_matches("a.b.c", "a.b"));
        assert!(InMemoryBroker::topic_matches("a.*.c", "a.x.c"));
        assert!(!InMemoryBroker::topic_matches("a.*.c", "a.x.y.c"));
        assert!(InMemoryBroker::topic_matches("#", "anything.at.all"));
        assert!(InMemoryBroker::topic_matches("a.#", "a"));
        assert!(InMemoryBroker::topic_matches("a.#", "a.b.c"));
        assert!(!InMemoryBroker::topic_matches("a.#", "b.c"));
    }

    #[tokio::test]
    async fn test_publish_pop_ack() {
        let broker = broker_with_queue("q1");

        broker
            .publish("ex", "q1", b"hello".to_vec(), &headers())
            .await
            .unwrap();
        assert_eq!(broker.queue_count("q1").await.unwrap(), 1);

        let delivery = broker.pop("q1").await.unwrap().unwrap();
        assert_eq!(delivery.payload, b"hello");
        assert_eq!(delivery.correlation_id.as_deref(), Some("t1"));
        assert_eq!(delivery.headers.get("senderId").unwrap(), "S1");
        assert!(!delivery.redelivered);
        assert_eq!(broker.queue_count("q1").await.unwrap(), 0);

        broker.ack("q1", delivery.delivery_tag).await.unwrap();
        assert!(broker.pop("q1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nack_requeues_with_redelivered_flag() {
        let broker = broker_with_queue("q1");
        broker
            .publish("ex", "q1", b"x".to_vec(), &headers())
            .await
            .unwrap();

        let delivery = broker.pop("q1").await.unwrap().unwrap();
        broker.nack("q1", delivery.delivery_tag, true).await.unwrap();

        let redelivery = broker.pop("q1").await.unwrap().unwrap();
        assert!(redelivery.redelivered);
    }

    #[tokio::test]
    async fn test_delivery_limit_dead_letters() {
        let broker = InMemoryBroker::new().with_delivery_limit(2);
        broker.declare_exchange("ex");
        broker.declare_queue("q1", Some("q1-failed"));
        broker.declare_queue("q1-failed", None);
        broker.bind("ex", "q1", "q1").unwrap();

        broker
            .publish("ex", "q1", b"x".to_vec(), &headers())
            .await
            .unwrap();

        for _ in 0..2 {
            let delivery = broker.pop("q1").await.unwrap().unwrap();
            broker.nack("q1", delivery.delivery_tag, true).await.unwrap();
        }

        assert_eq!(broker.queue_count("q1").await.unwrap(), 0);
        assert_eq!(broker.queue_count("q1-failed").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nack_without_requeue_dead_letters_immediately() {
        let broker = InMemoryBroker::new();
        broker.declare_exchange("ex");
        broker.declare_queue("q1", Some("q1-failed"));
        broker.declare_queue("q1-failed", None);
        broker.bind("ex", "q1", "q1").unwrap();

        broker
            .publish("ex", "q1", b"x".to_vec(), &headers())
            .await
            .unwrap();
        let delivery = broker.pop("q1").await.unwrap().unwrap();
        broker.nack("q1", delivery.delivery_tag, false).await.unwrap();

        assert_eq!(broker.queue_count("q1-failed").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fanout_to_multiple_bindings() {
        let broker = InMemoryBroker::new();
        broker.declare_exchange("ex");
        broker.declare_queue("q1", None);
        broker.declare_queue("q2", None);
        broker.bind("ex", "#", "q1").unwrap();
        broker.bind("ex", "topic-a", "q2").unwrap();

        broker
            .publish("ex", "topic-a", b"x".to_vec(), &headers())
            .await
            .unwrap();

        assert_eq!(broker.queue_count("q1").await.unwrap(), 1);
        assert_eq!(broker.queue_count("q2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unroutable_publish_is_dropped() {
        let broker = broker_with_queue("q1");
        broker
            .publish("ex", "elsewhere", b"x".to_vec(), &headers())
            .await
            .unwrap();
        assert_eq!(broker.queue_count("q1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_exchange_and_queue_error() {
        let broker = InMemoryBroker::new();
        assert!(broker
            .publish("nope", "t", Vec::new(), &headers())
            .await
            .is_err());
        assert!(broker.pop("nope").await.is_err());
        assert!(broker.queue_count("nope").await.is_err());
    }
}
