// State Store Port - unit-of-work over the durable entities
//
// Each consumed broker message is processed inside exactly one database
// transaction; broker acknowledgement happens only after a successful
// commit.

use crate::domain::{SedexMessage, SyncJob, Transaction};
use crate::error::Result;
use async_trait::async_trait;

/// Factory for per-message units of work
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Begin a new unit of work
    async fn begin(&self) -> Result<Box<dyn StateUnit>>;
}

/// Entity operations inside a single database transaction
#[async_trait]
pub trait StateUnit: Send {
    async fn find_transaction(&mut self, transaction_id: &str) -> Result<Option<Transaction>>;

    /// Unique-key clash on `transaction_id` surfaces as
    /// `AppError::DataIntegrityViolation`
    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()>;

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<()>;

    async fn find_sync_job(&mut self, job_id: &str) -> Result<Option<SyncJob>>;

    /// Unique-key clash on `job_id` surfaces as
    /// `AppError::DataIntegrityViolation`
    async fn insert_sync_job(&mut self, job: &SyncJob) -> Result<()>;

    async fn update_sync_job(&mut self, job: &SyncJob) -> Result<()>;

    async fn find_sedex_messages_by_job_id(&mut self, job_id: &str) -> Result<Vec<SedexMessage>>;

    /// Commit the unit of work
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Roll back the unit of work
    async fn rollback(self: Box<Self>) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct StoreState {
        transactions: HashMap<String, Transaction>,
        sync_jobs: HashMap<String, SyncJob>,
        sedex_messages: HashMap<String, SedexMessage>,
    }

    /// In-memory state store for processor unit tests. Writes are buffered
    /// per unit and applied on commit, so rollback and duplicate-insert
    /// behavior match the real adapter.
    pub struct InMemoryStateStore {
        state: Arc<Mutex<StoreState>>,
    }

    impl InMemoryStateStore {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(StoreState::default())),
            }
        }

        pub fn put_transaction(&self, transaction: Transaction) {
            let mut state = self.state.lock().unwrap();
            state
                .transactions
                .insert(transaction.transaction_id.clone(), transaction);
        }

        pub fn put_sync_job(&self, job: SyncJob) {
            let mut state = self.state.lock().unwrap();
            state.sync_jobs.insert(job.job_id.clone(), job);
        }

        pub fn put_sedex_message(&self, message: SedexMessage) {
            let mut state = self.state.lock().unwrap();
            state
                .sedex_messages
                .insert(message.message_id.clone(), message);
        }

        pub fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
            self.state
                .lock()
                .unwrap()
                .transactions
                .get(transaction_id)
                .cloned()
        }

        pub fn sync_job(&self, job_id: &str) -> Option<SyncJob> {
            self.state.lock().unwrap().sync_jobs.get(job_id).cloned()
        }
    }

    impl Default for InMemoryStateStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl StateStore for InMemoryStateStore {
        async fn begin(&self) -> Result<Box<dyn StateUnit>> {
            Ok(Box::new(InMemoryStateUnit {
                state: Arc::clone(&self.state),
                pending_transactions: HashMap::new(),
                pending_sync_jobs: HashMap::new(),
            }))
        }
    }

    struct InMemoryStateUnit {
        state: Arc<Mutex<StoreState>>,
        pending_transactions: HashMap<String, Transaction>,
        pending_sync_jobs: HashMap<String, SyncJob>,
    }

    #[async_trait]
    impl StateUnit for InMemoryStateUnit {
        async fn find_transaction(&mut self, transaction_id: &str) -> Result<Option<Transaction>> {
            if let Some(tx) = self.pending_transactions.get(transaction_id) {
                return Ok(Some(tx.clone()));
            }
            Ok(self
                .state
                .lock()
                .unwrap()
                .transactions
                .get(transaction_id)
                .cloned())
        }

        async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
            let exists = self.pending_transactions.contains_key(&transaction.transaction_id)
                || self
                    .state
                    .lock()
                    .unwrap()
                    .transactions
                    .contains_key(&transaction.transaction_id);
            if exists {
                return Err(AppError::DataIntegrityViolation(format!(
                    "transaction {} already exists",
                    transaction.transaction_id
                )));
            }
            self.pending_transactions
                .insert(transaction.transaction_id.clone(), transaction.clone());
            Ok(())
        }

        async fn update_transaction(&mut self, transaction: &Transaction) -> Result<()> {
            self.pending_transactions
                .insert(transaction.transaction_id.clone(), transaction.clone());
            Ok(())
        }

        async fn find_sync_job(&mut self, job_id: &str) -> Result<Option<SyncJob>> {
            if let Some(job) = self.pending_sync_jobs.get(job_id) {
                return Ok(Some(job.clone()));
            }
            Ok(self.state.lock().unwrap().sync_jobs.get(job_id).cloned())
        }

        async fn insert_sync_job(&mut self, job: &SyncJob) -> Result<()> {
            let exists = self.pending_sync_jobs.contains_key(&job.job_id)
                || self.state.lock().unwrap().sync_jobs.contains_key(&job.job_id);
            if exists {
                return Err(AppError::DataIntegrityViolation(format!(
                    "sync job {} already exists",
                    job.job_id
                )));
            }
            self.pending_sync_jobs.insert(job.job_id.clone(), job.clone());
            Ok(())
        }

        async fn update_sync_job(&mut self, job: &SyncJob) -> Result<()> {
            self.pending_sync_jobs.insert(job.job_id.clone(), job.clone());
            Ok(())
        }

        async fn find_sedex_messages_by_job_id(
            &mut self,
            job_id: &str,
        ) -> Result<Vec<SedexMessage>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .sedex_messages
                .values()
                .filter(|m| m.job_id.as_deref() == Some(job_id))
                .cloned()
                .collect())
        }

        async fn commit(self: Box<Self>) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            for (id, tx) in self.pending_transactions {
                state.transactions.insert(id, tx);
            }
            for (id, job) in self.pending_sync_jobs {
                state.sync_jobs.insert(id, job);
            }
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }
}
