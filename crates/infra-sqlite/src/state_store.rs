// SQLite StateStore Implementation - per-message unit of work

use async_trait::async_trait;
use lwgs_core::domain::{SedexMessage, SyncJob, Transaction};
use lwgs_core::error::Result;
use lwgs_core::port::{StateStore, StateUnit};
use sqlx::{Sqlite, SqlitePool, Transaction as SqlxTransaction};
use tracing::debug;

use crate::rows::{SedexMessageRow, SyncJobRow, TransactionRow};
use crate::sqlx_error::map_sqlx_error;

pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn begin(&self) -> Result<Box<dyn StateUnit>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteStateUnit { tx }))
    }
}

pub struct SqliteStateUnit {
    tx: SqlxTransaction<'static, Sqlite>,
}

#[async_trait]
impl StateUnit for SqliteStateUnit {
    async fn find_transaction(&mut self, transaction_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE transaction_id = ?",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_transaction()))
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (transaction_id, state, job_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.transaction_id)
        .bind(transaction.state.to_string())
        .bind(&transaction.job_id)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE transactions
            SET state = ?, updated_at = ?
            WHERE transaction_id = ?
            "#,
        )
        .bind(transaction.state.to_string())
        .bind(transaction.updated_at)
        .bind(&transaction.transaction_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_sync_job(&mut self, job_id: &str) -> Result<Option<SyncJob>> {
        let row = sqlx::query_as::<_, SyncJobRow>("SELECT * FROM sync_jobs WHERE job_id = ?")
            .bind(job_id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_sync_job()))
    }

    async fn insert_sync_job(&mut self, job: &SyncJob) -> Result<()> {
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
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update_sync_job(&mut self, job: &SyncJob) -> Result<()> {
        // Terminal rows never regress, even across processes
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
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            debug!(job_id = %job.job_id, "Sync job update skipped (terminal or missing row)");
        }
        Ok(())
    }

    async fn find_sedex_messages_by_job_id(&mut self, job_id: &str) -> Result<Vec<SedexMessage>> {
        let rows: Vec<SedexMessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM sedex_messages
            WHERE job_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|r| r.into_sedex_message()).collect())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use lwgs_core::domain::JobType;
    use lwgs_core::error::AppError;

    async fn setup() -> SqliteStateStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteStateStore::new(pool)
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = setup().await;

        let mut unit = store.begin().await.unwrap();
        unit.insert_transaction(&Transaction::new("t1", 1000))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        assert!(unit.find_transaction("t1").await.unwrap().is_some());
        unit.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = setup().await;

        let mut unit = store.begin().await.unwrap();
        unit.insert_transaction(&Transaction::new("t1", 1000))
            .await
            .unwrap();
        unit.rollback().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        assert!(unit.find_transaction("t1").await.unwrap().is_none());
        unit.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_insert_surfaces_inside_unit() {
        let store = setup().await;

        let mut unit = store.begin().await.unwrap();
        unit.insert_sync_job(&SyncJob::new("j1", JobType::Full, 1000))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        let mut unit = store.begin().await.unwrap();
        let err = unit
            .insert_sync_job(&SyncJob::new("j1", JobType::Full, 2000))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataIntegrityViolation(_)));
        unit.rollback().await.unwrap();
    }
}
