// SQLite SettingRepository Implementation

use async_trait::async_trait;
use lwgs_core::domain::Setting;
use lwgs_core::error::Result;
use lwgs_core::port::SettingRepository;
use sqlx::SqlitePool;

use crate::sqlx_error::map_sqlx_error;

pub struct SqliteSettingRepository {
    pool: SqlitePool,
}

impl SqliteSettingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingRepository for SqliteSettingRepository {
    async fn find_by_key(&self, key: &str) -> Result<Option<Setting>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(|(key, value)| Setting { key, value }))
    }

    async fn upsert(&self, setting: &Setting) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(&setting.key)
        .bind(&setting.value)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
