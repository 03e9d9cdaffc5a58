// SyncJob Entity
//
// One row per full-sync cycle. Created lazily on first reference from a
// transaction-state event; terminal transitions are owned by the sedex
// message state processor.

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};
use crate::domain::headers::JobType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncJobState {
    New,
    Sending,
    Sent,
    Completed,
    Failed,
    FailedProcessing,
}

impl std::fmt::Display for SyncJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncJobState::New => write!(f, "NEW"),
            SyncJobState::Sending => write!(f, "SENDING"),
            SyncJobState::Sent => write!(f, "SENT"),
            SyncJobState::Completed => write!(f, "COMPLETED"),
            SyncJobState::Failed => write!(f, "FAILED"),
            SyncJobState::FailedProcessing => write!(f, "FAILED_PROCESSING"),
        }
    }
}

impl SyncJobState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(SyncJobState::New),
            "SENDING" => Some(SyncJobState::Sending),
            "SENT" => Some(SyncJobState::Sent),
            "COMPLETED" => Some(SyncJobState::Completed),
            "FAILED" => Some(SyncJobState::Failed),
            "FAILED_PROCESSING" => Some(SyncJobState::FailedProcessing),
            _ => None,
        }
    }

    /// COMPLETED and FAILED are the only terminal states;
    /// FAILED_PROCESSING stays open until escalated.
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncJobState::Completed | SyncJobState::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    /// Unique UUID
    pub job_id: String,
    pub job_type: JobType,
    pub state: SyncJobState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SyncJob {
    pub fn new(job_id: impl Into<String>, job_type: JobType, created_at: i64) -> Self {
        Self {
            job_id: job_id.into(),
            job_type,
            state: SyncJobState::New,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn transition(&mut self, to: SyncJobState, now_millis: i64) -> Result<()> {
        if self.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        self.updated_at = now_millis;
        Ok(())
    }

    /// Transaction-level failure observed while the job is still open
    pub fn mark_failed_processing(&mut self, now_millis: i64) -> Result<()> {
        self.transition(SyncJobState::FailedProcessing, now_millis)
    }

    /// Unanimous SUCCESSFUL over a non-empty sedex message set
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(SyncJobState::Completed, now_millis)
    }

    /// At least one FAILED sedex message
    pub fn fail(&mut self, now_millis: i64) -> Result<()> {
        self.transition(SyncJobState::Failed, now_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_from_open_state() {
        let mut job = SyncJob::new("j1", JobType::Full, 1000);
        job.complete(2000).unwrap();
        assert_eq!(job.state, SyncJobState::Completed);
        assert_eq!(job.updated_at, 2000);
    }

    #[test]
    fn test_terminal_rejects_further_transitions() {
        let mut job = SyncJob::new("j1", JobType::Full, 1000);
        job.fail(2000).unwrap();
        assert!(job.complete(3000).is_err());
        assert!(job.mark_failed_processing(3000).is_err());
        assert_eq!(job.state, SyncJobState::Failed);
    }

    #[test]
    fn test_failed_processing_is_not_terminal() {
        let mut job = SyncJob::new("j1", JobType::Full, 1000);
        job.mark_failed_processing(2000).unwrap();
        assert!(!job.is_terminal());
        // Escalation to FAILED still possible
        job.fail(3000).unwrap();
        assert!(job.is_terminal());
    }
}
