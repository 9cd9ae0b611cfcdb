#[cfg(feature = "local-embeddings")]
pub mod fastembed;
pub mod openai;

use async_trait::async_trait;

/// Abstract embedding model interface.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a list of text chunks for ingestion. Returns a vector of embeddings.
    async fn embed_for_ingestion(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_for_query(&self, query: &str) -> anyhow::Result<Vec<f32>>;

    /// Return the embedding dimensions.
    fn dimensions(&self) -> u32;
}

/// Reject embeddings whose width does not match the configured dimensions.
pub(crate) fn check_dimensions(embeddings: &[Vec<f32>], expected: u32) -> anyhow::Result<()> {
    for emb in embeddings {
        if emb.len() != expected as usize {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                expected,
                emb.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(&[vec![0.0; 3], vec![1.0; 3]], 3).is_ok());
        let err = check_dimensions(&[vec![0.0; 3], vec![1.0; 2]], 3).unwrap_err();
        assert!(err.to_string().contains("expected 3, got 2"));
    }
}
