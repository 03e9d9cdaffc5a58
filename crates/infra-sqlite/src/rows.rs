// SQLite row representations shared by the pool repositories and the
// per-message unit of work

use lwgs_core::domain::{
    JobType, SedexMessage, SedexMessageState, SyncJob, SyncJobState, Transaction,
    TransactionState,
};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TransactionRow {
    pub transaction_id: String,
    pub state: String,
    pub job_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TransactionRow {
    pub(crate) fn into_transaction(self) -> Transaction {
        Transaction {
            transaction_id: self.transaction_id,
            // Unparseable rows fall back to the terminal sink
            state: TransactionState::parse(&self.state).unwrap_or(TransactionState::Failed),
            job_id: self.job_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SyncJobRow {
    pub job_id: String,
    pub job_type: String,
    pub state: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SyncJobRow {
    pub(crate) fn into_sync_job(self) -> SyncJob {
        SyncJob {
            job_id: self.job_id,
            job_type: JobType::parse(&self.job_type).unwrap_or(JobType::Full),
            state: SyncJobState::parse(&self.state).unwrap_or(SyncJobState::Failed),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SedexMessageRow {
    pub message_id: String,
    pub job_id: Option<String>,
    pub state: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SedexMessageRow {
    pub(crate) fn into_sedex_message(self) -> SedexMessage {
        SedexMessage {
            message_id: self.message_id,
            job_id: self.job_id,
            state: SedexMessageState::parse(&self.state).unwrap_or(SedexMessageState::Failed),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
