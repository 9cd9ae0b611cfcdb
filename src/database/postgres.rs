use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

use super::Database;
use crate::models::upload::{UploadRecord, UploadStatus};

/// PostgreSQL table for upload metadata.
pub struct PostgresDatabase {
    pool: PgPool,
}

impl PostgresDatabase {
    pub async fn new(uri: &str, pool_size: u32) -> anyhow::Result<Self> {
        let clean_uri = uri.replace("postgresql+asyncpg://", "postgresql://");
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&clean_uri)
            .await?;

        info!("Connected to PostgreSQL (pool_size={pool_size})");
        Ok(Self { pool })
    }
}

fn record_from_row(r: &PgRow) -> anyhow::Result<UploadRecord> {
    let status: String = r.get("status");
    Ok(UploadRecord {
        id: r.get("id"),
        file_name: r.get("file_name"),
        file_extension: r.get("file_extension"),
        created_at: r.get::<chrono::DateTime<chrono::Utc>, _>("created_at"),
        status: UploadStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("Unknown upload status '{status}'"))?,
    })
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS uploads (
                id VARCHAR(40) PRIMARY KEY,
                file_name VARCHAR(512) NOT NULL,
                file_extension VARCHAR(32) NOT NULL,
                status VARCHAR(16) NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_uploads_created_at ON uploads(created_at)")
            .execute(&self.pool)
            .await?;

        info!("Database tables initialized");
        Ok(())
    }

    async fn insert_upload(&self, record: &UploadRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO uploads (id, file_name, file_extension, status, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.id)
        .bind(&record.file_name)
        .bind(&record.file_extension)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_upload(&self, id: &str) -> anyhow::Result<Option<UploadRecord>> {
        let row = sqlx::query(
            "SELECT id, file_name, file_extension, status, created_at
             FROM uploads
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_uploads(&self, limit: Option<i64>) -> anyhow::Result<Vec<UploadRecord>> {
        // LIMIT NULL means no limit in Postgres.
        let rows = sqlx::query(
            "SELECT id, file_name, file_extension, status, created_at
             FROM uploads
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn update_status(&self, id: &str, status: UploadStatus) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE uploads SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
