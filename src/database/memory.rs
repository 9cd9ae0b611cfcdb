use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Database;
use crate::models::upload::{UploadRecord, UploadStatus};

/// In-process upload table for development and testing.
#[derive(Default)]
pub struct MemoryDatabase {
    records: RwLock<HashMap<String, UploadRecord>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_upload(&self, record: &UploadRecord) -> anyhow::Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            anyhow::bail!("Upload {} already exists", record.id);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_upload(&self, id: &str) -> anyhow::Result<Option<UploadRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_uploads(&self, limit: Option<i64>) -> anyhow::Result<Vec<UploadRecord>> {
        let mut all: Vec<UploadRecord> = self.records.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            all.truncate(limit.max(0) as usize);
        }
        Ok(all)
    }

    async fn update_status(&self, id: &str, status: UploadStatus) -> anyhow::Result<bool> {
        match self.records.write().await.get_mut(id) {
            Some(record) => {
                record.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_insert_get_update() {
        let db = MemoryDatabase::new();
        let record = UploadRecord::new("a.txt", "txt");
        db.insert_upload(&record).await.unwrap();

        let fetched = db.get_upload(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched, record);

        assert!(db.update_status(&record.id, UploadStatus::Completed).await.unwrap());
        let fetched = db.get_upload(&record.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, UploadStatus::Completed);

        assert!(!db.update_status("missing", UploadStatus::Failed).await.unwrap());
        assert!(db.get_upload("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let db = MemoryDatabase::new();
        let record = UploadRecord::new("a.txt", "txt");
        db.insert_upload(&record).await.unwrap();
        assert!(db.insert_upload(&record).await.is_err());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let db = MemoryDatabase::new();
        let now = Utc::now();
        for i in 0..3 {
            let mut record = UploadRecord::new(&format!("f{i}.txt"), "txt");
            record.created_at = now + Duration::seconds(i);
            db.insert_upload(&record).await.unwrap();
        }

        let listed = db.list_uploads(Some(2)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].file_name, "f2.txt");
        assert_eq!(listed[1].file_name, "f1.txt");

        assert_eq!(db.list_uploads(None).await.unwrap().len(), 3);
    }
}
