// SedexMessage Repository Port (Interface)

use crate::domain::SedexMessage;
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for SedexMessage persistence
///
/// Writes are owned by the external batcher; the core aggregates over the
/// rows via `find_all_by_job_id`.
#[async_trait]
pub trait SedexMessageRepository: Send + Sync {
    /// Insert a new sedex message
    async fn insert(&self, message: &SedexMessage) -> Result<()>;

    /// Find sedex message by its id
    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<SedexMessage>>;

    /// All sedex messages belonging to a sync job
    async fn find_all_by_job_id(&self, job_id: &str) -> Result<Vec<SedexMessage>>;

    /// Update an existing sedex message
    async fn update(&self, message: &SedexMessage) -> Result<()>;
}
