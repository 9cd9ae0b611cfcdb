//! Local embeddings via fastembed (ONNX all-MiniLM-L6-v2, 384 dimensions).

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{EmbeddingModel, check_dimensions};

/// Output width of all-MiniLM-L6-v2.
pub const MINILM_DIMENSIONS: u32 = 384;

/// fastembed's model runs synchronously, so calls go through `spawn_blocking`.
pub struct FastEmbedModel {
    model: Arc<::fastembed::TextEmbedding>,
    dimensions: u32,
}

impl FastEmbedModel {
    /// Load the model, downloading weights into `cache_dir` on first use.
    pub fn new(cache_dir: &Path, dimensions: u32) -> anyhow::Result<Self> {
        if dimensions != MINILM_DIMENSIONS {
            anyhow::bail!(
                "fastembed all-MiniLM-L6-v2 produces {MINILM_DIMENSIONS}-dimensional vectors, \
                 but embedding.dimensions is {dimensions}"
            );
        }

        let options = ::fastembed::InitOptions::new(::fastembed::EmbeddingModel::AllMiniLML6V2)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(false);
        let model = ::fastembed::TextEmbedding::try_new(options)?;

        info!("Loaded fastembed model from {}", cache_dir.display());
        Ok(Self {
            model: Arc::new(model),
            dimensions,
        })
    }

    async fn embed_blocking(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let embeddings = tokio::task::spawn_blocking(move || model.embed(texts, None))
            .await
            .map_err(|e| anyhow::anyhow!("embedding task failed: {e}"))??;
        check_dimensions(&embeddings, self.dimensions)?;
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingModel for FastEmbedModel {
    async fn embed_for_ingestion(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        self.embed_blocking(texts.to_vec()).await
    }

    async fn embed_for_query(&self, query: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_blocking(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding returned for query"))
    }

    fn dimensions(&self) -> u32 {
        self.dimensions
    }
}
