// SQLite TransactionRepository Implementation

use async_trait::async_trait;
use lwgs_core::domain::Transaction;
use lwgs_core::error::Result;
use lwgs_core::port::TransactionRepository;
use sqlx::SqlitePool;

use crate::rows::TransactionRow;
use crate::sqlx_error::map_sqlx_error;

pub struct SqliteTransactionRepository {
    pool: SqlitePool,
}

impl SqliteTransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for SqliteTransactionRepository {
    async fn insert(&self, transaction: &Transaction) -> Result<()> {
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
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transactions WHERE transaction_id = ?",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_transaction()))
    }

    async fn update(&self, transaction: &Transaction) -> Result<()> {
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
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use lwgs_core::domain::TransactionState;
    use lwgs_core::error::AppError;

    async fn setup() -> SqliteTransactionRepository {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteTransactionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = setup().await;
        let tx = Transaction::new("t1", 1000).with_job_id("j1");

        repo.insert(&tx).await.unwrap();

        let found = repo.find_by_transaction_id("t1").await.unwrap().unwrap();
        assert_eq!(found.transaction_id, "t1");
        assert_eq!(found.state, TransactionState::New);
        assert_eq!(found.job_id.as_deref(), Some("j1"));
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_integrity_violation() {
        let repo = setup().await;
        let tx = Transaction::new("t1", 1000);

        repo.insert(&tx).await.unwrap();
        let err = repo.insert(&tx).await.unwrap_err();
        assert!(matches!(err, AppError::DataIntegrityViolation(_)));
    }

    #[tokio::test]
    async fn test_update_state() {
        let repo = setup().await;
        let mut tx = Transaction::new("t1", 1000);
        repo.insert(&tx).await.unwrap();

        tx.apply_state(TransactionState::Processed, 2000);
        repo.update(&tx).await.unwrap();

        let found = repo.find_by_transaction_id("t1").await.unwrap().unwrap();
        assert_eq!(found.state, TransactionState::Processed);
        assert_eq!(found.updated_at, 2000);
    }
}
