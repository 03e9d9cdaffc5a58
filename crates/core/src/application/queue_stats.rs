// Queue Statistics Probe
//
// Read-only view into broker queue depths for operator/UI consumption.
// Best-effort, no caching.

use std::sync::Arc;

use crate::error::Result;
use crate::port::MessageBroker;

pub struct QueueStatsProbe {
    broker: Arc<dyn MessageBroker>,
}

impl QueueStatsProbe {
    pub fn new(broker: Arc<dyn MessageBroker>) -> Self {
        Self { broker }
    }

    /// Ready-message count of a queue from the broker's management surface
    pub async fn queue_count(&self, queue: &str) -> Result<u64> {
        self.broker.queue_count(queue).await
    }
}
