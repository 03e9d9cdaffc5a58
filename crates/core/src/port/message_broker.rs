// Message Broker Port (Interface)
//
// Publish/consume/acknowledge surface over the AMQP-style broker plus its
// management (queue-count) view. Consumption is pull-based: worker loops
// poll `pop` the same way the job-engine pattern polls its queue table.

use std::collections::HashMap;

use crate::domain::MessageHeaders;
use crate::error::Result;
use async_trait::async_trait;

/// An in-flight message handed to a consumer. The headers stay in their
/// untyped wire form until the consumer parses them once.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
    pub correlation_id: Option<String>,
    pub delivery_tag: u64,
    pub redelivered: bool,
}

#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish a payload to an exchange under a routing topic. The header
    /// envelope is rendered onto the message and its correlation id is set
    /// from the envelope.
    async fn publish(
        &self,
        exchange: &str,
        topic: &str,
        payload: Vec<u8>,
        headers: &MessageHeaders,
    ) -> Result<()>;

    /// Take the next ready message off a queue, leaving it unacknowledged.
    /// Returns `None` when the queue is empty.
    async fn pop(&self, queue: &str) -> Result<Option<Delivery>>;

    /// Acknowledge a delivery
    async fn ack(&self, queue: &str, delivery_tag: u64) -> Result<()>;

    /// Negatively acknowledge a delivery. With `requeue` the message goes
    /// back to the queue (subject to the broker's delivery limit);
    /// without, it is dead-lettered per queue policy.
    async fn nack(&self, queue: &str, delivery_tag: u64, requeue: bool) -> Result<()>;

    /// Ready-message count from the management surface. Best-effort, no
    /// caching guarantees.
    async fn queue_count(&self, queue: &str) -> Result<u64>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// One captured publish
    #[derive(Debug, Clone)]
    pub struct PublishedMessage {
        pub exchange: String,
        pub topic: String,
        pub payload: Vec<u8>,
        pub headers: MessageHeaders,
        pub correlation_id: Option<String>,
    }

    /// Broker mock that records every publish for assertions
    pub struct RecordingBroker {
        published: Mutex<Vec<PublishedMessage>>,
    }

    impl RecordingBroker {
        pub fn new() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
            }
        }

        pub fn published(&self) -> Vec<PublishedMessage> {
            self.published.lock().unwrap().clone()
        }
    }

    impl Default for RecordingBroker {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl MessageBroker for RecordingBroker {
        async fn publish(
            &self,
            exchange: &str,
            topic: &str,
            payload: Vec<u8>,
            headers: &MessageHeaders,
        ) -> Result<()> {
            self.published.lock().unwrap().push(PublishedMessage {
                exchange: exchange.to_string(),
                topic: topic.to_string(),
                payload,
                headers: headers.clone(),
                correlation_id: headers.correlation_id(),
            });
            Ok(())
        }

        async fn pop(&self, _queue: &str) -> Result<Option<Delivery>> {
            Ok(None)
        }

        async fn ack(&self, _queue: &str, _delivery_tag: u64) -> Result<()> {
            Ok(())
        }

        async fn nack(&self, _queue: &str, _delivery_tag: u64, _requeue: bool) -> Result<()> {
            Ok(())
        }

        async fn queue_count(&self, _queue: &str) -> Result<u64> {
            Ok(0)
        }
    }
}
