pub mod local;
pub mod s3;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("S3 error: {0}")]
    S3(String),
    #[error("{0}")]
    Other(String),
}

/// Object storage for raw uploaded files.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Prepare the backend (create directory or default bucket).
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Upload raw bytes. Returns the (bucket, key) the object was written to.
    async fn upload_bytes(
        &self,
        data: &[u8],
        key: &str,
        content_type: Option<&str>,
        bucket: &str,
    ) -> Result<(String, String), StorageError>;

    /// Download file content.
    async fn download_file(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Delete a file. Returns false if nothing was there.
    async fn delete_file(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Return the provider name for logging.
    fn provider_name(&self) -> &str;

    /// Return the default bucket name.
    fn default_bucket(&self) -> &str;
}

/// Best-effort content type from a file extension.
pub fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => Some("application/pdf"),
        "txt" | "md" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "xls" => Some("application/vnd.ms-excel"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        _ => None,
    }
}
