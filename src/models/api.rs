use serde::{Deserialize, Serialize};

use crate::models::upload::UploadRecord;

// ──────────────────────────── Upload ────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<UploadRecord>,
}

// ──────────────────────────── Search ────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query_msg: String,
    /// Restrict retrieval to chunks of this file.
    #[serde(default)]
    pub file_selection: Option<String>,
}

/// Per-chunk summary returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub similarity: f64,
    pub chunk_info: String,
    /// File name from the upload record; `None` if the record is gone.
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAnswer {
    pub response: Vec<ChunkResult>,
    pub answer: String,
    pub file_name: String,
}

// ──────────────────────────── Health ────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
