use async_trait::async_trait;
use aws_sdk_s3::Client;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use super::{Storage, StorageError};

/// S3 storage backend. Works against AWS or any S3-compatible endpoint such as MinIO.
pub struct S3Storage {
    client: Client,
    pub default_bucket_name: String,
    upload_semaphore: Arc<Semaphore>,
    region: String,
}

impl S3Storage {
    pub fn new(
        aws_access_key: &str,
        aws_secret_key: &str,
        region: &str,
        default_bucket: &str,
        endpoint: Option<&str>,
        upload_concurrency: u32,
    ) -> Self {
        let creds = aws_sdk_s3::config::Credentials::new(
            aws_access_key,
            aws_secret_key,
            None,
            None,
            "rag-qna",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .credentials_provider(creds);

        // Self-hosted endpoints do not resolve virtual-hosted bucket names.
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            default_bucket_name: default_bucket.to_string(),
            upload_semaphore: Arc::new(Semaphore::new(upload_concurrency.max(1) as usize)),
            region: region.to_string(),
        }
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self.client.head_bucket().bucket(bucket).send().await.is_ok() {
            return Ok(());
        }

        let mut req = self.client.create_bucket().bucket(bucket);
        if self.region != "us-east-1" {
            let constraint = aws_sdk_s3::types::CreateBucketConfiguration::builder()
                .location_constraint(aws_sdk_s3::types::BucketLocationConstraint::from(
                    self.region.as_str(),
                ))
                .build();
            req = req.create_bucket_configuration(constraint);
        }
        match req.send().await {
            Ok(_) => {
                info!("Bucket '{bucket}' created");
                Ok(())
            }
            Err(e) => {
                let msg = format!("{e}");
                if msg.contains("BucketAlreadyOwnedByYou") || msg.contains("BucketAlreadyExists") {
                    Ok(())
                } else {
                    Err(StorageError::S3(msg))
                }
            }
        }
    }

    fn resolve_bucket<'a>(&'a self, bucket: &'a str) -> &'a str {
        if bucket.is_empty() {
            &self.default_bucket_name
        } else {
            bucket
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn initialize(&self) -> Result<(), StorageError> {
        self.ensure_bucket(&self.default_bucket_name).await
    }

    async fn upload_bytes(
        &self,
        data: &[u8],
        key: &str,
        content_type: Option<&str>,
        bucket: &str,
    ) -> Result<(String, String), StorageError> {
        let target_bucket = self.resolve_bucket(bucket);
        let _permit = self
            .upload_semaphore
            .acquire()
            .await
            .map_err(|e| StorageError::Other(format!("Semaphore error: {e}")))?;

        self.ensure_bucket(target_bucket).await?;

        let body = aws_sdk_s3::primitives::ByteStream::from(data.to_vec());
        let mut req = self
            .client
            .put_object()
            .bucket(target_bucket)
            .key(key)
            .body(body);

        if let Some(ct) = content_type {
            req = req.content_type(ct);
        }

        req.send().await.map_err(|e| {
            error!("S3 upload error: {e}");
            StorageError::S3(format!("{e}"))
        })?;

        Ok((target_bucket.to_string(), key.to_string()))
    }

    async fn download_file(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let target_bucket = self.resolve_bucket(bucket);
        let resp = self
            .client
            .get_object()
            .bucket(target_bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("{e}");
                if msg.contains("NoSuchKey") || msg.contains("404") {
                    StorageError::NotFound {
                        bucket: target_bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::S3(msg)
                }
            })?;

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(format!("Failed to read S3 body: {e}")))?;

        Ok(bytes.to_vec())
    }

    async fn delete_file(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let target_bucket = self.resolve_bucket(bucket);
        self.client
            .delete_object()
            .bucket(target_bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!("S3 delete error: {e}");
                StorageError::S3(format!("{e}"))
            })?;
        info!("Deleted {key} from bucket {target_bucket}");
        Ok(true)
    }

    fn provider_name(&self) -> &str {
        "aws-s3"
    }

    fn default_bucket(&self) -> &str {
        &self.default_bucket_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_bucket_falls_back_to_default() {
        let storage = S3Storage::new(
            "minio",
            "minio123",
            "us-east-1",
            "rag-qna-input-files",
            Some("http://localhost:9000"),
            4,
        );
        assert_eq!(storage.resolve_bucket(""), "rag-qna-input-files");
        assert_eq!(storage.resolve_bucket("other"), "other");
        assert_eq!(storage.default_bucket(), "rag-qna-input-files");
        assert_eq!(storage.provider_name(), "aws-s3");
    }
}
