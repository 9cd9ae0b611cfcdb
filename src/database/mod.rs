pub mod memory;
pub mod mongo;
pub mod postgres;

use async_trait::async_trait;

use crate::models::upload::{UploadRecord, UploadStatus};

/// Document database holding upload metadata and processing status.
#[async_trait]
pub trait Database: Send + Sync {
    /// Create tables / indexes.
    async fn initialize(&self) -> anyhow::Result<()>;

    /// Insert a new upload record.
    async fn insert_upload(&self, record: &UploadRecord) -> anyhow::Result<()>;

    /// Look up an upload record by id.
    async fn get_upload(&self, id: &str) -> anyhow::Result<Option<UploadRecord>>;

    /// List upload records, newest first.
    async fn list_uploads(&self, limit: Option<i64>) -> anyhow::Result<Vec<UploadRecord>>;

    /// Set the processing status. Returns false if no record matched.
    async fn update_status(&self, id: &str, status: UploadStatus) -> anyhow::Result<bool>;
}
