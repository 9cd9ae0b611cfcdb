use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::database::Database;
use crate::embedding::EmbeddingModel;
use crate::models::chunk::ChunkRecord;
use crate::models::upload::{UploadMessage, UploadStatus};
use crate::parser::{self, ParseError};
use crate::queue::MessageQueue;
use crate::storage::{Storage, StorageError};
use crate::vector_store::VectorStore;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Upload status is {0:?}, expected \"uploaded\"")]
    InvalidStatus(String),
    #[error("Upload {0} not found")]
    UploadNotFound(String),
    #[error("Upload {0} has no file name")]
    MissingFileName(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{stage} failed: {source}")]
    Upstream {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

fn upstream(stage: &'static str) -> impl FnOnce(anyhow::Error) -> WorkerError {
    move |e| WorkerError::Upstream {
        stage,
        source: e.into(),
    }
}

/// Pause after a failed queue read before polling again.
const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Turns uploaded files into searchable chunks, one queue message at a time.
pub struct Worker {
    pub queue: Arc<dyn MessageQueue>,
    pub database: Arc<dyn Database>,
    pub storage: Arc<dyn Storage>,
    pub embedding_model: Arc<dyn EmbeddingModel>,
    pub vector_store: Arc<dyn VectorStore>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Worker {
    /// Consume messages until the queue is closed.
    pub async fn run(&self) {
        info!(
            "Worker listening on {} queue",
            self.queue.provider_name()
        );

        loop {
            match self.queue.next_message().await {
                Ok(Some(payload)) => {
                    if let Err(e) = self.handle_payload(&payload).await {
                        debug!("Message not processed: {e}");
                    }
                }
                Ok(None) => {
                    info!("Queue closed, worker stopping");
                    break;
                }
                Err(e) => {
                    error!("Failed to receive message: {e}");
                    tokio::time::sleep(RECEIVE_BACKOFF).await;
                }
            }
        }
    }

    /// Process one raw queue payload. Undecodable payloads are skipped;
    /// any later failure marks the upload `failed`.
    pub async fn handle_payload(&self, payload: &str) -> Result<(), WorkerError> {
        let message: UploadMessage = match serde_json::from_str(payload) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping undecodable message: {e}");
                return Ok(());
            }
        };

        let Some(document_id) = message.document_id.as_deref() else {
            warn!("Skipping message without document_id");
            return Ok(());
        };

        let start = Instant::now();
        match self.process(document_id, message.status.as_deref()).await {
            Ok(chunk_count) => {
                info!(
                    "Processed upload {document_id}: {chunk_count} chunks in {:.2}s",
                    start.elapsed().as_secs_f64()
                );
                Ok(())
            }
            Err(e) => {
                error!("Processing upload {document_id} failed: {e}");
                if let Err(update_err) = self
                    .database
                    .update_status(document_id, UploadStatus::Failed)
                    .await
                {
                    error!("Could not mark upload {document_id} as failed: {update_err}");
                }
                Err(e)
            }
        }
    }

    async fn process(&self, document_id: &str, status: Option<&str>) -> Result<usize, WorkerError> {
        if let Some(other) = status.filter(|s| *s != UploadStatus::Uploaded.as_str()) {
            return Err(WorkerError::InvalidStatus(other.to_string()));
        }

        let record = self
            .database
            .get_upload(document_id)
            .await
            .map_err(upstream("database"))?
            .ok_or_else(|| WorkerError::UploadNotFound(document_id.to_string()))?;

        if status.is_none() && record.status != UploadStatus::Uploaded {
            return Err(WorkerError::InvalidStatus(record.status.to_string()));
        }
        if record.file_name.is_empty() {
            return Err(WorkerError::MissingFileName(document_id.to_string()));
        }

        let bytes = self
            .storage
            .download_file(self.storage.default_bucket(), &record.file_name)
            .await?;

        let extension = if record.file_extension.is_empty() {
            parser::file_extension(&record.file_name)
        } else {
            record.file_extension.as_str()
        };
        let text = parser::extract_text(bytes, extension).await?;

        self.set_status(document_id, UploadStatus::Embedding).await?;

        let chunks = parser::split_into_chunks(
            &record.file_name,
            &text,
            self.chunk_size,
            self.chunk_overlap,
        );
        let chunk_count = chunks.len();
        let records: Vec<ChunkRecord> = if chunks.is_empty() {
            warn!("Upload {document_id} produced no text to index");
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embeddings = self
                .embedding_model
                .embed_for_ingestion(&texts)
                .await
                .map_err(upstream("embedding"))?;
            if embeddings.len() != chunks.len() {
                return Err(upstream("embedding")(anyhow::anyhow!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                )));
            }

            chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| chunk.into_record(document_id, &record.file_name, embedding))
                .collect()
        };

        // Chunks from an earlier run of this document are dropped, even when nothing replaces them.
        self.vector_store
            .replace_chunks(document_id, &records)
            .await
            .map_err(upstream("vector store"))?;

        self.set_status(document_id, UploadStatus::Completed).await?;
        Ok(chunk_count)
    }

    async fn set_status(&self, document_id: &str, status: UploadStatus) -> Result<(), WorkerError> {
        let updated = self
            .database
            .update_status(document_id, status)
            .await
            .map_err(upstream("database"))?;
        if !updated {
            return Err(WorkerError::UploadNotFound(document_id.to_string()));
        }
        Ok(())
    }
}
