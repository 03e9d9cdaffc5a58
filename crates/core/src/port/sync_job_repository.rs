// SyncJob Repository Port (Interface)

use crate::domain::SyncJob;
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for SyncJob persistence
///
/// `insert` must surface a unique-key clash on `job_id` as
/// `AppError::DataIntegrityViolation`; lazy creation treats that as
/// "another writer got there first".
#[async_trait]
pub trait SyncJobRepository: Send + Sync {
    /// Insert a new sync job
    async fn insert(&self, job: &SyncJob) -> Result<()>;

    /// Find sync job by its natural key
    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<SyncJob>>;

    /// Update an existing sync job
    async fn update(&self, job: &SyncJob) -> Result<()>;
}
