use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::time::Instant;
use tracing::{debug, info};

use super::{VectorStore, to_vector_literal};
use crate::models::chunk::{ChunkRecord, ChunkRow};

/// PostgreSQL with pgvector implementation for vector storage.
pub struct PGVectorStore {
    pool: PgPool,
    dimensions: u32,
}

impl PGVectorStore {
    pub async fn new(uri: &str, pool_size: u32, dimensions: u32) -> anyhow::Result<Self> {
        let clean_uri = uri.replace("postgresql+asyncpg://", "postgresql://");

        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&clean_uri)
            .await?;

        info!("Created PGVector store connection pool (size={pool_size})");

        Ok(Self { pool, dimensions })
    }

    async fn insert_chunks(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        chunks: &[ChunkRecord],
    ) -> anyhow::Result<()> {
        for chunk in chunks {
            if chunk.embedding.len() != self.dimensions as usize {
                anyhow::bail!(
                    "Chunk {} has {} dimensions, table expects {}",
                    chunk.chunk_info,
                    chunk.embedding.len(),
                    self.dimensions
                );
            }

            sqlx::query(
                "INSERT INTO embeddings (document_id, file_name, chunk_info, content, embedding)
                 VALUES ($1, $2, $3, $4, $5::vector)",
            )
            .bind(&chunk.document_id)
            .bind(&chunk.file_name)
            .bind(&chunk.chunk_info)
            .bind(&chunk.content)
            .bind(to_vector_literal(&chunk.embedding))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PGVectorStore {
    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;
        info!("Enabled pgvector extension");

        let create_sql = format!(
            "CREATE TABLE IF NOT EXISTS embeddings (
                id SERIAL PRIMARY KEY,
                document_id VARCHAR(40) NOT NULL,
                file_name VARCHAR(512) NOT NULL,
                chunk_info VARCHAR(512) NOT NULL,
                content TEXT NOT NULL,
                embedding vector({}) NOT NULL
            )",
            self.dimensions
        );
        sqlx::query(&create_sql).execute(&self.pool).await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_document_id ON embeddings(document_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_file_name ON embeddings(file_name)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_embeddings_vector ON embeddings
             USING hnsw (embedding vector_cosine_ops)",
        )
        .execute(&self.pool)
        .await?;

        info!("embeddings table ready with vector({})", self.dimensions);
        Ok(())
    }

    async fn store_chunks(&self, chunks: &[ChunkRecord]) -> anyhow::Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let mut tx = self.pool.begin().await?;
        self.insert_chunks(&mut tx, chunks).await?;
        tx.commit().await?;
        debug!(
            "Stored {} chunks in {:.3}s",
            chunks.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(chunks.len())
    }

    async fn query_similar(
        &self,
        query_embedding: &[f32],
        k: usize,
        file_name: Option<&str>,
    ) -> anyhow::Result<Vec<ChunkRow>> {
        let embedding_str = to_vector_literal(query_embedding);

        let rows = if let Some(name) = file_name {
            sqlx::query(
                "SELECT document_id, file_name, content, chunk_info,
                        1 - (embedding <=> $1::vector) AS similarity
                 FROM embeddings
                 WHERE file_name = $3
                 ORDER BY embedding <=> $1::vector
                 LIMIT $2",
            )
            .bind(&embedding_str)
            .bind(k as i64)
            .bind(name)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT document_id, file_name, content, chunk_info,
                        1 - (embedding <=> $1::vector) AS similarity
                 FROM embeddings
                 ORDER BY embedding <=> $1::vector
                 LIMIT $2",
            )
            .bind(&embedding_str)
            .bind(k as i64)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows
            .into_iter()
            .map(|row| ChunkRow {
                document_id: row.get("document_id"),
                embedding: vec![],
                similarity: row.get("similarity"),
                file_name: row.get("file_name"),
                content: row.get("content"),
                chunk_info: row.get("chunk_info"),
            })
            .collect())
    }

    async fn replace_chunks(
        &self,
        document_id: &str,
        chunks: &[ChunkRecord],
    ) -> anyhow::Result<usize> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM embeddings WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        self.insert_chunks(&mut tx, chunks).await?;

        tx.commit().await?;
        debug!(
            "Replaced {deleted} chunks of {document_id} with {} in {:.3}s",
            chunks.len(),
            start.elapsed().as_secs_f64()
        );

        Ok(chunks.len())
    }
}
