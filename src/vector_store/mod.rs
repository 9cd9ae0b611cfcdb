pub mod memory;
pub mod pgvector;

use async_trait::async_trait;

use crate::models::chunk::{ChunkRecord, ChunkRow};

/// Chunk embeddings with top-K cosine-similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Initialize the store (create tables, etc.).
    async fn initialize(&self) -> anyhow::Result<()>;

    /// Store chunks and their embeddings. Returns the number of rows written.
    async fn store_chunks(&self, chunks: &[ChunkRecord]) -> anyhow::Result<usize>;

    /// Up to `k` rows ordered by descending similarity, optionally restricted
    /// to chunks of one file.
    async fn query_similar(
        &self,
        query_embedding: &[f32],
        k: usize,
        file_name: Option<&str>,
    ) -> anyhow::Result<Vec<ChunkRow>>;

    /// Swap every chunk of `document_id` for `chunks` atomically. An empty
    /// slice clears the document. Returns the number of rows written.
    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[ChunkRecord],
    ) -> anyhow::Result<usize>;
}

/// pgvector text literal, e.g. `[0.1,0.2]`.
pub(crate) fn to_vector_literal(embedding: &[f32]) -> String {
    format!(
        "[{}]",
        embedding
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    )
}
