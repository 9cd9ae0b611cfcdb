use async_trait::async_trait;
use std::cmp::Ordering;
use tokio::sync::RwLock;

use super::VectorStore;
use crate::models::chunk::{ChunkRecord, ChunkRow};

/// In-memory vector store for development and testing.
///
/// Uses brute-force cosine similarity search.
#[derive(Default)]
pub struct MemoryVectorStore {
    chunks: RwLock<Vec<ChunkRecord>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn store_chunks(&self, chunks: &[ChunkRecord]) -> anyhow::Result<usize> {
        self.chunks.write().await.extend_from_slice(chunks);
        Ok(chunks.len())
    }

    async fn query_similar(
        &self,
        query_embedding: &[f32],
        k: usize,
        file_name: Option<&str>,
    ) -> anyhow::Result<Vec<ChunkRow>> {
        let chunks = self.chunks.read().await;
        let mut rows: Vec<ChunkRow> = chunks
            .iter()
            .filter(|c| file_name.is_none_or(|name| c.file_name == name))
            .map(|c| ChunkRow {
                document_id: c.document_id.clone(),
                embedding: vec![],
                similarity: cosine_similarity(query_embedding, &c.embedding),
                file_name: c.file_name.clone(),
                content: c.content.clone(),
                chunk_info: c.chunk_info.clone(),
            })
            .collect();

        rows.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        rows.truncate(k);
        Ok(rows)
    }

    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[ChunkRecord],
    ) -> anyhow::Result<usize> {
        let mut stored = self.chunks.write().await;
        stored.retain(|c| c.document_id != document_id);
        stored.extend_from_slice(chunks);
        Ok(chunks.len())
    }
}

/// Cosine similarity in [-1, 1]; 0 for zero-length or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
