use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Database;
use crate::models::upload::{UploadRecord, UploadStatus};

/// Stored shape of an upload. `created_at` is a BSON date so the collection
/// sorts and filters on real timestamps.
#[derive(Debug, Serialize, Deserialize)]
struct UploadDocument {
    id: String,
    file_name: String,
    file_extension: String,
    created_at: bson::DateTime,
    status: UploadStatus,
}

impl From<&UploadRecord> for UploadDocument {
    fn from(record: &UploadRecord) -> Self {
        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            file_extension: record.file_extension.clone(),
            created_at: bson::DateTime::from_millis(record.created_at.timestamp_millis()),
            status: record.status,
        }
    }
}

impl TryFrom<UploadDocument> for UploadRecord {
    type Error = anyhow::Error;

    fn try_from(document: UploadDocument) -> anyhow::Result<Self> {
        let millis = document.created_at.timestamp_millis();
        let created_at = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| anyhow::anyhow!("Upload {} has an out-of-range created_at", document.id))?;
        Ok(Self {
            id: document.id,
            file_name: document.file_name,
            file_extension: document.file_extension,
            created_at,
            status: document.status,
        })
    }
}

/// MongoDB collection for upload metadata. Records are matched on their `id`
/// field, never on Mongo's `_id`.
pub struct MongoDatabase {
    collection: Collection<UploadDocument>,
}

impl MongoDatabase {
    pub async fn new(uri: &str, database: &str, collection: &str) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let collection = client.database(database).collection(collection);

        info!("Connected to MongoDB (database={database})");
        Ok(Self { collection })
    }
}

#[async_trait]
impl Database for MongoDatabase {
    async fn initialize(&self) -> anyhow::Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;

        info!("MongoDB indexes initialized");
        Ok(())
    }

    async fn insert_upload(&self, record: &UploadRecord) -> anyhow::Result<()> {
        self.collection.insert_one(UploadDocument::from(record)).await?;
        Ok(())
    }

    async fn get_upload(&self, id: &str) -> anyhow::Result<Option<UploadRecord>> {
        self.collection
            .find_one(doc! { "id": id })
            .await?
            .map(UploadRecord::try_from)
            .transpose()
    }

    async fn list_uploads(&self, limit: Option<i64>) -> anyhow::Result<Vec<UploadRecord>> {
        let mut find = self
            .collection
            .find(doc! {})
            .sort(doc! { "created_at": -1 });
        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        let documents: Vec<UploadDocument> = find.await?.try_collect().await?;
        documents.into_iter().map(UploadRecord::try_from).collect()
    }

    async fn update_status(&self, id: &str, status: UploadStatus) -> anyhow::Result<bool> {
        let result = self
            .collection
            .update_one(doc! { "id": id }, doc! { "$set": { "status": status.as_str() } })
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_created_at_is_stored_as_bson_date() {
        let mut record = UploadRecord::new("report.pdf", "pdf");
        record.created_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let stored = bson::to_document(&UploadDocument::from(&record)).unwrap();
        assert!(matches!(stored.get("created_at"), Some(bson::Bson::DateTime(_))));
        assert_eq!(stored.get_str("status").unwrap(), "uploaded");

        let document: UploadDocument = bson::from_document(stored).unwrap();
        assert_eq!(UploadRecord::try_from(document).unwrap(), record);
    }

    #[test]
    fn test_reads_documents_written_by_other_clients() {
        let created_at = bson::DateTime::from_millis(1_700_000_000_123);
        let stored = doc! {
            "_id": ObjectId::new(),
            "id": "3f0c",
            "file_name": "a.pdf",
            "file_extension": "pdf",
            "created_at": created_at,
            "status": "completed",
        };

        let document: UploadDocument = bson::from_document(stored).unwrap();
        let record = UploadRecord::try_from(document).unwrap();
        assert_eq!(record.id, "3f0c");
        assert_eq!(record.status, UploadStatus::Completed);
        assert_eq!(record.created_at.timestamp_millis(), 1_700_000_000_123);
    }
}
