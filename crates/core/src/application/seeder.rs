// Job Seeder - admission of person-data records
//
// Admits one record into the pipeline: validates the sender identity,
// assigns a transaction id, publishes the record on the `lwgs` exchange and
// an empty state shadow on `lwgs-state` under the same topic and
// correlation id. The two publishes are not atomic; the shadow is
// idempotent because the state processor upserts on NEW.

use std::sync::Arc;

use tracing::debug;

use crate::config::SedexConfig;
use crate::domain::topology::{
    EXCHANGE_LWGS, EXCHANGE_LWGS_STATE, QUEUE_FULL_INCOMING, QUEUE_PARTIAL_INCOMING,
};
use crate::domain::{JobType, MessageCategory, MessageHeaders, PersonDataRecord, TransactionState};
use crate::error::Result;
use crate::port::{IdProvider, MessageBroker, TimeProvider};

use super::full_sync::FullSyncStateManager;

pub struct JobSeeder {
    broker: Arc<dyn MessageBroker>,
    full_sync: Arc<FullSyncStateManager>,
    config: SedexConfig,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobSeeder {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        full_sync: Arc<FullSyncStateManager>,
        config: SedexConfig,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            broker,
            full_sync,
            config,
            id_provider,
            time_provider,
        }
    }

    /// Admit a record in partial (streaming) mode. Returns the generated
    /// transaction id.
    pub async fn seed_to_partial(
        &self,
        payload: impl Into<String>,
        sender_id: Option<&str>,
    ) -> Result<String> {
        let sender = self.config.resolve_sender(sender_id)?;
        let transaction_id = self.id_provider.generate_id();

        let headers = MessageHeaders::builder()
            .sender_id(sender)
            .job_type(JobType::Partial)
            .category(MessageCategory::TransactionEvent)
            .transaction_state(TransactionState::New)
            .transaction_id(transaction_id.clone())
            .timestamp(self.time_provider.now_millis())
            .build();

        self.publish_record(QUEUE_PARTIAL_INCOMING, payload.into(), &headers)
            .await?;
        Ok(transaction_id)
    }

    /// Admit a record under the current full-sync job. Returns `None`
    /// without publishing unless the full-sync manager is in SEEDING.
    pub async fn seed_to_full(
        &self,
        payload: impl Into<String>,
        sender_id: Option<&str>,
    ) -> Result<Option<String>> {
        let sender = self.config.resolve_sender(sender_id)?;
        if !self.full_sync.is_in_state_seeding().await {
            debug!("Rejecting full seed outside SEEDING");
            return Ok(None);
        }
        let Some(job_id) = self.full_sync.current_job_id().await else {
            debug!("Rejecting full seed: no current job id");
            return Ok(None);
        };

        let transaction_id = self.id_provider.generate_id();
        let headers = MessageHeaders::builder()
            .sender_id(sender)
            .job_type(JobType::Full)
            .job_id(job_id)
            .category(MessageCategory::TransactionEvent)
            .transaction_state(TransactionState::New)
            .transaction_id(transaction_id.clone())
            .timestamp(self.time_provider.now_millis())
            .build();

        self.publish_record(QUEUE_FULL_INCOMING, payload.into(), &headers)
            .await?;
        self.full_sync.inc_seed_counter().await?;
        Ok(Some(transaction_id))
    }

    async fn publish_record(
        &self,
        topic: &str,
        payload: String,
        headers: &MessageHeaders,
    ) -> Result<()> {
        let record = PersonDataRecord {
            transaction_id: headers
                .transaction_id
                .clone()
                .unwrap_or_default(),
            payload,
        };
        let body = serde_json::to_vec(&record)?;

        self.broker
            .publish(EXCHANGE_LWGS, topic, body, headers)
            .await?;
        // Empty state shadow on the state exchange, same topic and headers
        self.broker
            .publish(EXCHANGE_LWGS_STATE, topic, Vec::new(), headers)
            .await?;
        Ok(())
    }
}
