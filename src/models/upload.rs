use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploaded,
    Embedding,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::Embedding => "embedding",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "uploaded" => Some(UploadStatus::Uploaded),
            "embedding" => Some(UploadStatus::Embedding),
            "completed" => Some(UploadStatus::Completed),
            "failed" => Some(UploadStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata kept in the document database for every uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub id: String,
    pub file_name: String,
    pub file_extension: String,
    pub created_at: DateTime<Utc>,
    pub status: UploadStatus,
}

impl UploadRecord {
    /// New record in the `uploaded` state with a fresh id.
    pub fn new(file_name: &str, file_extension: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            file_extension: file_extension.to_string(),
            created_at: Utc::now(),
            status: UploadStatus::Uploaded,
        }
    }
}

/// Queue payload announcing a stored upload to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMessage {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UploadMessage {
    pub fn uploaded(document_id: &str) -> Self {
        Self {
            document_id: Some(document_id.to_string()),
            status: Some(UploadStatus::Uploaded.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_uploaded() {
        let record = UploadRecord::new("notes.txt", "txt");
        assert_eq!(record.status, UploadStatus::Uploaded);
        assert_eq!(record.file_extension, "txt");
        assert!(uuid::Uuid::parse_str(&record.id).is_ok());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(UploadStatus::Embedding).unwrap();
        assert_eq!(json, "embedding");
        assert_eq!(UploadStatus::parse("failed"), Some(UploadStatus::Failed));
        assert_eq!(UploadStatus::parse("FAILED"), None);
    }

    #[test]
    fn test_upload_message_wire_format() {
        let msg = UploadMessage::uploaded("abc");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["document_id"], "abc");
        assert_eq!(json["status"], "uploaded");

        let partial: UploadMessage = serde_json::from_str(r#"{"document_id": "x"}"#).unwrap();
        assert_eq!(partial.status, None);
    }
}
