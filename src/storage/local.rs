use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

use super::{Storage, StorageError};

/// Local filesystem storage backend.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(storage_path: &str) -> Self {
        Self {
            base_path: PathBuf::from(storage_path),
        }
    }

    /// Buckets map to subdirectories; the empty bucket is the base directory.
    fn resolve_path(&self, bucket: &str, key: &str) -> PathBuf {
        if bucket.is_empty() {
            self.base_path.join(key)
        } else {
            self.base_path.join(bucket).join(key)
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn initialize(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    async fn upload_bytes(
        &self,
        data: &[u8],
        key: &str,
        _content_type: Option<&str>,
        bucket: &str,
    ) -> Result<(String, String), StorageError> {
        let path = self.resolve_path(bucket, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok((bucket.to_string(), key.to_string()))
    }

    async fn download_file(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve_path(bucket, key);
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn delete_file(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve_path(bucket, key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn provider_name(&self) -> &str {
        "local"
    }

    fn default_bucket(&self) -> &str {
        ""
    }
}
