pub mod aggregate;
pub mod answer;
pub mod synthesizer;

use std::sync::Arc;
use tracing::info;

use crate::database::Database;
use crate::embedding::EmbeddingModel;
use crate::models::api::SearchAnswer;
use crate::vector_store::VectorStore;
use synthesizer::AnswerSynthesizer;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Malformed chunk label: {label:?}")]
    MalformedChunkLabel { label: String },
    #[error("{stage} failed: {source}")]
    Upstream {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

pub(crate) fn upstream(stage: &'static str) -> impl FnOnce(anyhow::Error) -> SearchError {
    move |e| SearchError::Upstream {
        stage,
        source: e.into(),
    }
}

/// Question answering over the stored chunks.
pub struct SearchService {
    pub embedding_model: Arc<dyn EmbeddingModel>,
    pub vector_store: Arc<dyn VectorStore>,
    pub database: Arc<dyn Database>,
    pub synthesizer: Arc<dyn AnswerSynthesizer>,
    pub top_k: usize,
    pub max_output_length: u32,
}

impl SearchService {
    /// Embed the query, fetch the top chunks (optionally from one file only),
    /// rebuild the documents they came from and answer from the best one.
    pub async fn answer_query(
        &self,
        query: &str,
        file_selection: Option<&str>,
    ) -> Result<SearchAnswer, SearchError> {
        let query_embedding = self
            .embedding_model
            .embed_for_query(query)
            .await
            .map_err(upstream("embedding"))?;

        let rows = self
            .vector_store
            .query_similar(&query_embedding, self.top_k, file_selection)
            .await
            .map_err(upstream("vector store"))?;
        info!("Retrieved {} chunks for query", rows.len());

        let documents = aggregate::aggregate_chunks(&rows)?;

        answer::assemble_answer(
            &documents,
            &rows,
            query,
            self.database.as_ref(),
            self.synthesizer.as_ref(),
            self.max_output_length,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDatabase;
    use crate::models::chunk::{ChunkRecord, ChunkRow};
    use crate::models::upload::UploadRecord;
    use crate::vector_store::memory::MemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds every query to the same fixed vector.
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingModel for FixedEmbedder {
        async fn embed_for_ingestion(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
        async fn embed_for_query(&self, _query: &str) -> anyhow::Result<Vec<f32>> {
            Ok(self.0.clone())
        }
        fn dimensions(&self) -> u32 {
            self.0.len() as u32
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingModel for FailingEmbedder {
        async fn embed_for_ingestion(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("embedding service down")
        }
        async fn embed_for_query(&self, _query: &str) -> anyhow::Result<Vec<f32>> {
            anyhow::bail!("embedding service down")
        }
        fn dimensions(&self) -> u32 {
            2
        }
    }

    /// A vector store whose backend is gone.
    struct OfflineVectorStore;

    #[async_trait]
    impl VectorStore for OfflineVectorStore {
        async fn initialize(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn store_chunks(&self, _chunks: &[ChunkRecord]) -> anyhow::Result<usize> {
            anyhow::bail!("pool timed out")
        }
        async fn query_similar(
            &self,
            _query_embedding: &[f32],
            _k: usize,
            _file_name: Option<&str>,
        ) -> anyhow::Result<Vec<ChunkRow>> {
            anyhow::bail!("pool timed out")
        }
        async fn replace_chunks(
            &self,
            _document_id: &str,
            _chunks: &[ChunkRecord],
        ) -> anyhow::Result<usize> {
            anyhow::bail!("pool timed out")
        }
    }

    #[derive(Default)]
    struct EchoSynthesizer {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnswerSynthesizer for EchoSynthesizer {
        async fn synthesize(&self, prompt: &str, _max: u32) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("answer".to_string())
        }
    }

    fn chunk(document_id: &str, chunk_info: &str, content: &str, embedding: Vec<f32>) -> ChunkRecord {
        let file_name = chunk_info
            .rsplit_once("_chunk_")
            .map(|(f, _)| f)
            .unwrap_or_default();
        ChunkRecord {
            document_id: document_id.to_string(),
            file_name: file_name.to_string(),
            chunk_info: chunk_info.to_string(),
            content: content.to_string(),
            embedding,
        }
    }

    async fn service(
        embedder: Arc<dyn EmbeddingModel>,
        chunks: &[ChunkRecord],
    ) -> (SearchService, Arc<EchoSynthesizer>) {
        let database = Arc::new(MemoryDatabase::new());
        for (id, name) in [("doc-a", "a.txt"), ("doc-b", "b.txt")] {
            let mut record = UploadRecord::new(name, "txt");
            record.id = id.to_string();
            database.insert_upload(&record).await.unwrap();
        }

        let vector_store = Arc::new(MemoryVectorStore::new());
        vector_store.store_chunks(chunks).await.unwrap();

        let synthesizer = Arc::new(EchoSynthesizer::default());
        let service = SearchService {
            embedding_model: embedder,
            vector_store,
            database,
            synthesizer: synthesizer.clone(),
            top_k: 10,
            max_output_length: 200,
        };
        (service, synthesizer)
    }

    #[tokio::test]
    async fn test_answer_query_end_to_end() {
        let chunks = vec![
            chunk("doc-a", "a.txt_chunk_1", "world", vec![1.0, 0.0]),
            chunk("doc-a", "a.txt_chunk_0", "hello", vec![1.0, 0.1]),
            chunk("doc-b", "b.txt_chunk_0", "unrelated", vec![0.0, 1.0]),
        ];
        let (service, synth) = service(Arc::new(FixedEmbedder(vec![1.0, 0.0])), &chunks).await;

        let answer = service.answer_query("greeting?", None).await.unwrap();
        assert_eq!(answer.answer, "answer");
        assert_eq!(answer.file_name, "a.txt");
        assert_eq!(answer.response.len(), 3);
        assert_eq!(
            synth.prompts.lock().unwrap()[0],
            "Query: greeting?; Context: hello world"
        );
    }

    #[tokio::test]
    async fn test_file_selection_restricts_retrieval() {
        let chunks = vec![
            chunk("doc-a", "a.txt_chunk_0", "close match", vec![1.0, 0.0]),
            chunk("doc-b", "b.txt_chunk_0", "far match", vec![0.0, 1.0]),
        ];
        let (service, _) = service(Arc::new(FixedEmbedder(vec![1.0, 0.0])), &chunks).await;

        let answer = service.answer_query("q", Some("b.txt")).await.unwrap();
        assert_eq!(answer.file_name, "b.txt");
        assert_eq!(answer.response.len(), 1);
        assert_eq!(answer.response[0].file_name.as_deref(), Some("b.txt"));
    }

    #[tokio::test]
    async fn test_empty_store_returns_sentinel() {
        let (service, synth) = service(Arc::new(FixedEmbedder(vec![1.0, 0.0])), &[]).await;
        let answer = service.answer_query("q", None).await.unwrap();
        assert_eq!(answer.answer, answer::NO_DOCUMENTS_ANSWER);
        assert!(synth.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_label_is_reported() {
        let mut bad = chunk("doc-a", "a.txt_chunk_0", "x", vec![1.0, 0.0]);
        bad.chunk_info = "a.txt#0".to_string();
        let (service, _) = service(Arc::new(FixedEmbedder(vec![1.0, 0.0])), &[bad]).await;

        let err = service.answer_query("q", None).await.unwrap_err();
        assert!(matches!(err, SearchError::MalformedChunkLabel { .. }));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_upstream() {
        let (service, _) = service(Arc::new(FailingEmbedder), &[]).await;
        let err = service.answer_query("q", None).await.unwrap_err();
        assert!(matches!(err, SearchError::Upstream { stage: "embedding", .. }));
        assert!(err.to_string().contains("embedding service down"));
    }

    #[tokio::test]
    async fn test_vector_store_failure_is_upstream() {
        let (mut service, synth) = service(Arc::new(FixedEmbedder(vec![1.0, 0.0])), &[]).await;
        service.vector_store = Arc::new(OfflineVectorStore);

        let err = service.answer_query("q", Some("a.txt")).await.unwrap_err();
        assert!(matches!(err, SearchError::Upstream { stage: "vector store", .. }));
        assert!(err.to_string().contains("pool timed out"));
        assert!(synth.prompts.lock().unwrap().is_empty());
    }
}
