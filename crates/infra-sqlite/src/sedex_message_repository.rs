// SQLite SedexMessageRepository Implementation

use async_trait::async_trait;
use lwgs_core::domain::SedexMessage;
use lwgs_core::error::Result;
use lwgs_core::port::SedexMessageRepository;
use sqlx::SqlitePool;

use crate::rows::SedexMessageRow;
use crate::sqlx_error::map_sqlx_error;

pub struct SqliteSedexMessageRepository {
    pool: SqlitePool,
}

impl SqliteSedexMessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SedexMessageRepository for SqliteSedexMessageRepository {
    async fn insert(&self, message: &SedexMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sedex_messages (message_id, job_id, state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.message_id)
        .bind(&message.job_id)
        .bind(message.state.to_string())
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<SedexMessage>> {
        let row = sqlx::query_as::<_, SedexMessageRow>(
            "SELECT * FROM sedex_messages WHERE message_id = ?",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| r.into_sedex_message()))
    }

    async fn find_all_by_job_id(&self, job_id: &str) -> Result<Vec<SedexMessage>> {
        let rows: Vec<SedexMessageRow> = sqlx::query_as(
            r#"
            SELECT * FROM sedex_messages
            WHERE job_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|r| r.into_sedex_message()).collect())
    }

    async fn update(&self, message: &SedexMessage) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sedex_messages
            SET state = ?, updated_at = ?
            WHERE message_id = ?
            "#,
        )
        .bind(message.state.to_string())
        .bind(message.updated_at)
        .bind(&message.message_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
