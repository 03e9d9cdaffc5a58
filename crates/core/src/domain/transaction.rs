// Transaction Entity
//
// One row per admitted person-data record. State advances monotonically
// along the pipeline; FAILED is a terminal sink reachable from any
// non-terminal state.

use serde::{Deserialize, Serialize};

use crate::domain::headers::TransactionState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Externally generated UUID, unique
    pub transaction_id: String,
    pub state: TransactionState,
    /// Present iff the record was admitted under a FULL job; never changed
    /// once set
    pub job_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Transaction {
    pub fn new(transaction_id: impl Into<String>, created_at: i64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            state: TransactionState::New,
            job_id: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Apply a state observed on the wire. Returns true when the entity
    /// changed. Backward moves are ignored; nothing leaves FAILED.
    pub fn apply_state(&mut self, state: TransactionState, now_millis: i64) -> bool {
        if self.state == TransactionState::Failed {
            return false;
        }
        if state.rank() <= self.state.rank() {
            return false;
        }
        self.state = state;
        self.updated_at = now_millis;
        true
    }
}
