// State Queue Consumers
//
// Pull-based consumption per queue: take a delivery, run the handler's unit
// of work, ack only after it committed. An unreconcilable event (unknown
// sync job) is rejected without requeue so the dead-letter policy applies;
// any other handler error nacks with requeue and leaves give-up decisions
// to the broker's delivery limit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::domain::MessageHeaders;
use crate::error::{AppError, Result};
use crate::port::{Delivery, MessageBroker};

use super::sedex_processor::SedexMessageStateProcessor;
use super::transaction_processor::TransactionStateProcessor;

// Idle polling backs off exponentially between these bounds and snaps back
// to the floor as soon as a delivery arrives
const POLL_DELAY_FLOOR: Duration = Duration::from_millis(50);
const POLL_DELAY_CEILING: Duration = Duration::from_millis(800);
const FAILURE_PAUSE: Duration = Duration::from_secs(2);

/// A consumer of parsed state events from one queue
#[async_trait]
pub trait StateEventHandler: Send + Sync {
    async fn handle(&self, headers: &MessageHeaders) -> Result<()>;
}

#[async_trait]
impl StateEventHandler for TransactionStateProcessor {
    async fn handle(&self, headers: &MessageHeaders) -> Result<()> {
        self.process(headers).await
    }
}

#[async_trait]
impl StateEventHandler for SedexMessageStateProcessor {
    async fn handle(&self, headers: &MessageHeaders) -> Result<()> {
        self.process(headers).await
    }
}

/// Worker polling one queue and dispatching to a handler. Several workers
/// over the same queue form a bounded pool; work items across workers are
/// unordered.
pub struct StateQueueWorker {
    queue: String,
    broker: Arc<dyn MessageBroker>,
    handler: Arc<dyn StateEventHandler>,
}

impl StateQueueWorker {
    pub fn new(
        queue: impl Into<String>,
        broker: Arc<dyn MessageBroker>,
        handler: Arc<dyn StateEventHandler>,
    ) -> Self {
        Self {
            queue: queue.into(),
            broker,
            handler,
        }
    }

    /// Consume until the stop flag flips. The delivery in flight when the
    /// flag flips is still acked or nacked before the loop exits.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) -> Result<()> {
        info!(queue = %self.queue, "State consumer online");
        let mut poll_delay = POLL_DELAY_FLOOR;
        while !*stop.borrow() {
            match self.process_next().await {
                Ok(true) => {
                    poll_delay = POLL_DELAY_FLOOR;
                }
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(poll_delay) => {
                            poll_delay = (poll_delay * 2).min(POLL_DELAY_CEILING);
                        }
                        _ = stop.changed() => {}
                    }
                }
                Err(e) => {
                    error!(queue = %self.queue, error = %e, "Consumer iteration failed");
                    tokio::select! {
                        _ = sleep(FAILURE_PAUSE) => {}
                        _ = stop.changed() => {}
                    }
                }
            }
        }
        info!(queue = %self.queue, "State consumer stopped");
        Ok(())
    }

    /// Process the next delivery (returns true if one was taken)
    pub async fn process_next(&self) -> Result<bool> {
        let delivery = match self.broker.pop(&self.queue).await? {
            Some(d) => d,
            None => return Ok(false),
        };
        self.dispatch(&delivery).await?;
        Ok(true)
    }

    async fn dispatch(&self, delivery: &Delivery) -> Result<()> {
        let headers = MessageHeaders::from_map(&delivery.headers);
        match self.handler.handle(&headers).await {
            Ok(()) => {
                self.broker.ack(&self.queue, delivery.delivery_tag).await?;
            }
            Err(AppError::SyncJobNotFound(msg)) => {
                // Unreconcilable; reject to the dead-letter policy
                warn!(queue = %self.queue, %msg, "Rejecting delivery without requeue");
                self.broker
                    .nack(&self.queue, delivery.delivery_tag, false)
                    .await?;
            }
            Err(e) => {
                error!(queue = %self.queue, error = %e, "Handler failed, requeueing delivery");
                debug!(correlation_id = ?delivery.correlation_id, redelivered = delivery.redelivered, "Failed delivery");
                self.broker
                    .nack(&self.queue, delivery.delivery_tag, true)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Spawn a bounded pool of identical workers over one queue.
pub fn spawn_worker_pool(
    worker: Arc<StateQueueWorker>,
    size: usize,
    stop: &watch::Receiver<bool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..size)
        .map(|i| {
            let worker = Arc::clone(&worker);
            let stop = stop.clone();
            tokio::spawn(async move {
                if let Err(e) = worker.run(stop).await {
                    error!("Worker {} failed: {}", i, e);
                }
            })
        })
        .collect()
}
