// SQLite SyncJobRepository Implementation

use async_trait::async_trait;
use lwgs_core::domain::SyncJob;
use lwgs_core::error::Result;
use lwgs_core::port::SyncJobRepository;
use sqlx::SqlitePool;
use tracing::debug;

use crate::rows::SyncJobRow;
use crate::sqlx_error::map_sqlx_error;

pub struct SqliteSyncJobRepository {
    pool: SqlitePool,
}

impl SqliteSyncJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncJobRepository for SqliteSyncJobRepository {
    async fn insert(&self, job: &SyncJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_jobs (job_id, job_type, state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.job_id)
        .bind(job.job_type.to_string())
        .bind(job.state.to_string())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<SyncJob>> {
        let row = sqlx::query_as::<_, SyncJobRow>("SELECT * FROM sync_jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_sync_job()))
    }

    async fn update(&self, job: &SyncJob) -> Result<()> {
        // Conditional update: a row already in a terminal state is never
        // regressed, even when another process settled it concurrently
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs
            SET state = ?, updated_at = ?
            WHERE job_id = ?
              AND state NOT IN ('COMPLETED', 'FAILED')
            "#,
        )
        .bind(job.state.to_string())
        .bind(job.updated_at)
        .bind(&job.job_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            debug!(job_id = %job.job_id, "Sync job update skipped (terminal or missing row)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use lwgs_core::domain::{JobType, SyncJobState};
    use lwgs_core::error::AppError;

    async fn setup() -> SqliteSyncJobRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteSyncJobRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = setup().await;
        let job = SyncJob::new("j1", JobType::Full, 1000);

        repo.insert(&job).await.unwrap();

        let found = repo.find_by_job_id("j1").await.unwrap().unwrap();
        assert_eq!(found.job_id, "j1");
        assert_eq!(found.job_type, JobType::Full);
        assert_eq!(found.state, SyncJobState::New);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_integrity_violation() {
        let repo = setup().await;
        let job = SyncJob::new("j1", JobType::Full, 1000);

        repo.insert(&job).await.unwrap();
        let err = repo.insert(&job).await.unwrap_err();
        assert!(matches!(err, AppError::DataIntegrityViolation(_)));
    }

    #[tokio::test]
    async fn test_terminal_row_is_not_regressed() {
        let repo = setup().await;
        let mut job = SyncJob::new("j1", JobType::Full, 1000);
        repo.insert(&job).await.unwrap();

        job.complete(2000).unwrap();
        repo.update(&job).await.unwrap();

        // A stale writer holding the pre-terminal entity cannot move it back
        let stale = SyncJob::new("j1", JobType::Full, 1000);
        repo.update(&stale).await.unwrap();

        let found = repo.find_by_job_id("j1").await.unwrap().unwrap();
        assert_eq!(found.state, SyncJobState::Completed);
    }
}
