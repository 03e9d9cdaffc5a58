// Transaction State Processor
//
// Consumes `transaction-state` events. Owns the Transaction rows and the
// lazy creation of SyncJob rows. Each consumed message runs in one unit of
// work; the broker ack happens only after a successful commit (see the
// consumer loop).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{
    JobType, MessageCategory, MessageHeaders, SyncJob, Transaction, TransactionState,
};
use crate::error::{AppError, Result};
use crate::port::{StateStore, StateUnit, TimeProvider};

use super::full_sync::FullSyncStateManager;

pub struct TransactionStateProcessor {
    store: Arc<dyn StateStore>,
    full_sync: Arc<FullSyncStateManager>,
    time_provider: Arc<dyn TimeProvider>,
    /// Process-local jobId -> SyncJob cache. Populated only on observation
    /// of a persisted row, never on creation, so a second process sees the
    /// row through the repository. Entries are never invalidated; the §4.6
    /// write path reloads from the store, so staleness is harmless here.
    job_cache: Mutex<HashMap<String, SyncJob>>,
    /// Post-NEW events for transactions whose NEW was never observed are
    /// dropped; this counter surfaces the volume.
    discarded_events: AtomicU64,
}

impl TransactionStateProcessor {
    pub fn new(
        store: Arc<dyn StateStore>,
        full_sync: Arc<FullSyncStateManager>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            full_sync,
            time_provider,
            job_cache: Mutex::new(HashMap::new()),
            discarded_events: AtomicU64::new(0),
        }
    }

    pub fn discarded_event_count(&self) -> u64 {
        self.discarded_events.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) async fn cached_job_ids(&self) -> Vec<String> {
        self.job_cache.lock().await.keys().cloned().collect()
    }

    /// Handle one transaction-state event.
    pub async fn process(&self, headers: &MessageHeaders) -> Result<()> {
        if headers.category != Some(MessageCategory::TransactionEvent) {
            debug!(category = ?headers.category, "Ignoring non-transaction event");
            return Ok(());
        }
        let Some(state) = headers.transaction_state else {
            warn!("Transaction event without transactionState, ignoring");
            return Ok(());
        };
        let Some(transaction_id) = headers.transaction_id.as_deref() else {
            warn!("Transaction event without transactionId, ignoring");
            return Ok(());
        };
        let ts = headers
            .timestamp
            .unwrap_or_else(|| self.time_provider.now_millis());

        let mut unit = self.store.begin().await?;
        let mut escalated_job: Option<String> = None;

        match state {
            TransactionState::New => {
                let mut transaction = Transaction::new(transaction_id, ts);
                if let Some(job_id) = headers.job_id.as_deref() {
                    self.ensure_sync_job(unit.as_mut(), job_id, headers.job_type, ts)
                        .await?;
                    transaction = transaction.with_job_id(job_id);
                }
                match unit.insert_transaction(&transaction).await {
                    Ok(()) => {}
                    Err(AppError::DataIntegrityViolation(msg)) => {
                        // Redelivered NEW; the prior row is authoritative
                        debug!(transaction_id = %transaction_id, %msg, "Dropping duplicate NEW");
                        return unit.rollback().await;
                    }
                    Err(e) => return Err(e),
                }
            }
            other => {
                if other == TransactionState::Failed {
                    escalated_job = self.escalate_job(unit.as_mut(), headers, ts).await?;
                }
                self.apply_transaction_state(unit.as_mut(), transaction_id, other, ts)
                    .await?;
            }
        }

        unit.commit().await?;

        // The process-wide full-sync lifecycle follows the job failure
        if let Some(job_id) = escalated_job {
            self.full_sync.escalate_failure(&job_id).await?;
        }
        Ok(())
    }

    /// Make sure the referenced SyncJob exists, creating it lazily on first
    /// reference. The cache mutex is held across check-and-insert so
    /// creation is serialized per process; cross-process races surface as
    /// a unique-key clash and mean another writer got there first.
    async fn ensure_sync_job(
        &self,
        unit: &mut dyn StateUnit,
        job_id: &str,
        job_type: Option<JobType>,
        ts: i64,
    ) -> Result<()> {
        let mut cache = self.job_cache.lock().await;
        if cache.contains_key(job_id) {
            return Ok(());
        }
        match unit.find_sync_job(job_id).await? {
            Some(job) => {
                cache.insert(job_id.to_string(), job);
            }
            None => {
                let job = SyncJob::new(job_id, job_type.unwrap_or(JobType::Full), ts);
                match unit.insert_sync_job(&job).await {
                    Ok(()) => {}
                    Err(AppError::DataIntegrityViolation(msg)) => {
                        debug!(job_id = %job_id, %msg, "Sync job created by another writer");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// FAILED is the only transaction state that escalates into the job:
    /// an existing FULL job moves to FAILED_PROCESSING. Terminal decisions
    /// stay with the sedex message state processor.
    async fn escalate_job(
        &self,
        unit: &mut dyn StateUnit,
        headers: &MessageHeaders,
        ts: i64,
    ) -> Result<Option<String>> {
        let Some(job_id) = headers.job_id.as_deref() else {
            return Ok(None);
        };
        let Some(mut job) = unit.find_sync_job(job_id).await? else {
            return Ok(None);
        };
        if job.job_type != JobType::Full {
            return Ok(None);
        }
        if job.is_terminal() {
            warn!(job_id = %job_id, state = %job.state, "Not escalating terminal job");
            return Ok(None);
        }
        job.mark_failed_processing(ts)?;
        unit.update_sync_job(&job).await?;
        Ok(Some(job_id.to_string()))
    }

    async fn apply_transaction_state(
        &self,
        unit: &mut dyn StateUnit,
        transaction_id: &str,
        state: TransactionState,
        ts: i64,
    ) -> Result<()> {
        match unit.find_transaction(transaction_id).await? {
            Some(mut transaction) => {
                if transaction.apply_state(state, ts) {
                    unit.update_transaction(&transaction).await?;
                }
            }
            None => {
                // Out-of-order redelivery; the NEW event will, or did,
                // create the row
                self.discarded_events.fetch_add(1, Ordering::Relaxed);
                debug!(transaction_id = %transaction_id, state = %state, "Dropping state for unknown transaction");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SyncJobState;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::state_store::mocks::InMemoryStateStore;
    use crate::port::time_provider::mocks::FixedTimeProvider;

    fn processor() -> (TransactionStateProcessor, Arc<InMemoryStateStore>, Arc<FullSyncStateManager>) {
        let store = Arc::new(InMemoryStateStore::new());
        let full_sync = Arc::new(FullSyncStateManager::new(Arc::new(
            SequentialIdProvider::new(),
        )));
        let proc = TransactionStateProcessor::new(
            store.clone(),
            full_sync.clone(),
            Arc::new(FixedTimeProvider::new(9_000)),
        );
        (proc, store, full_sync)
    }

    fn event(
        state: TransactionState,
        transaction_id: &str,
        job_id: Option<&str>,
        ts: i64,
    ) -> MessageHeaders {
        let mut builder = MessageHeaders::builder()
            .category(MessageCategory::TransactionEvent)
            .transaction_state(state)
            .transaction_id(transaction_id)
            .timestamp(ts);
        if let Some(job_id) = job_id {
            builder = builder.job_type(JobType::Full).job_id(job_id);
        } else {
            builder = builder.job_type(JobType::Partial);
        }
        builder.build()
    }

    #[tokio::test]
    async fn test_new_creates_transaction() {
        let (proc, store, _) = processor();
        proc.process(&event(TransactionState::New, "t1", None, 1000))
            .await
            .unwrap();

        let tx = store.transaction("t1").unwrap();
        assert_eq!(tx.state, TransactionState::New);
        assert_eq!(tx.created_at, 1000);
        assert!(tx.job_id.is_none());
    }

    #[tokio::test]
    async fn test_new_with_job_creates_sync_job_lazily() {
        let (proc, store, _) = processor();
        proc.process(&event(TransactionState::New, "t1", Some("j1"), 1000))
            .await
            .unwrap();

        let tx = store.transaction("t1").unwrap();
        assert_eq!(tx.job_id.as_deref(), Some("j1"));

        let job = store.sync_job("j1").unwrap();
        assert_eq!(job.state, SyncJobState::New);
        assert_eq!(job.job_type, JobType::Full);
        assert_eq!(job.created_at, 1000);

        // Populated on observation only, not on creation
        assert!(proc.cached_job_ids().await.is_empty());

        // A second reference observes the persisted row and caches it
        proc.process(&event(TransactionState::New, "t2", Some("j1"), 1100))
            .await
            .unwrap();
        assert_eq!(proc.cached_job_ids().await, vec!["j1".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_new_dropped() {
        let (proc, store, _) = processor();
        proc.process(&event(TransactionState::New, "t1", None, 1000))
            .await
            .unwrap();
        proc.process(&event(TransactionState::New, "t1", None, 2000))
            .await
            .unwrap();

        // Prior row stays authoritative
        let tx = store.transaction("t1").unwrap();
        assert_eq!(tx.created_at, 1000);
    }

    #[tokio::test]
    async fn test_later_state_updates_known_transaction() {
        let (proc, store, _) = processor();
        proc.process(&event(TransactionState::New, "t1", None, 1000))
            .await
            .unwrap();
        proc.process(&event(TransactionState::Processed, "t1", None, 2000))
            .await
            .unwrap();

        let tx = store.transaction("t1").unwrap();
        assert_eq!(tx.state, TransactionState::Processed);
        assert_eq!(tx.updated_at, 2000);
    }

    #[tokio::test]
    async fn test_state_for_unknown_transaction_dropped_and_counted() {
        let (proc, store, _) = processor();
        proc.process(&event(TransactionState::Sent, "ghost", None, 1000))
            .await
            .unwrap();

        assert!(store.transaction("ghost").is_none());
        assert_eq!(proc.discarded_event_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_escalates_full_job() {
        let (proc, store, _) = processor();
        proc.process(&event(TransactionState::New, "t1", Some("j1"), 1000))
            .await
            .unwrap();
        proc.process(&event(TransactionState::Failed, "t1", Some("j1"), 2000))
            .await
            .unwrap();

        let tx = store.transaction("t1").unwrap();
        assert_eq!(tx.state, TransactionState::Failed);

        let job = store.sync_job("j1").unwrap();
        assert_eq!(job.state, SyncJobState::FailedProcessing);
        assert_eq!(job.updated_at, 2000);
    }

    #[tokio::test]
    async fn test_failed_without_job_only_fails_transaction() {
        let (proc, store, _) = processor();
        proc.process(&event(TransactionState::New, "t1", None, 1000))
            .await
            .unwrap();
        proc.process(&event(TransactionState::Failed, "t1", None, 2000))
            .await
            .unwrap();

        assert_eq!(store.transaction("t1").unwrap().state, TransactionState::Failed);
    }

    #[tokio::test]
    async fn test_failed_escalates_into_full_sync_manager() {
        let (proc, store, full_sync) = processor();
        let job_id = full_sync.start_seeding().await.unwrap();
        full_sync.submit_seeding().await.unwrap();

        store.put_sync_job(SyncJob::new(&job_id, JobType::Full, 500));
        store.put_transaction(Transaction::new("t1", 500).with_job_id(&job_id));

        proc.process(&event(TransactionState::Failed, "t1", Some(&job_id), 2000))
            .await
            .unwrap();

        assert_eq!(
            full_sync.state().await,
            crate::application::full_sync::FullSyncState::Failed
        );
    }

    #[tokio::test]
    async fn test_non_transaction_category_ignored() {
        let (proc, store, _) = processor();
        let headers = MessageHeaders::builder()
            .category(MessageCategory::SedexEvent)
            .transaction_state(TransactionState::New)
            .transaction_id("t1")
            .timestamp(1000)
            .build();
        proc.process(&headers).await.unwrap();
        assert!(store.transaction("t1").is_none());
    }
}
