use std::sync::Arc;
use tracing::info;

use crate::completion::CompletionModel;
use crate::completion::openai::OpenAICompletionModel;
use crate::config::Settings;
use crate::database::Database;
use crate::database::memory::MemoryDatabase;
use crate::database::mongo::MongoDatabase;
use crate::database::postgres::PostgresDatabase;
use crate::embedding::EmbeddingModel;
use crate::embedding::openai::OpenAIEmbeddingModel;
use crate::queue::MessageQueue;
use crate::queue::channel::ChannelQueue;
use crate::queue::redis::RedisQueue;
use crate::search::SearchService;
use crate::search::synthesizer::{AnswerSynthesizer, CompletionSynthesizer};
use crate::storage::Storage;
use crate::storage::local::LocalStorage;
use crate::storage::s3::S3Storage;
use crate::vector_store::VectorStore;
use crate::vector_store::memory::MemoryVectorStore;
use crate::vector_store::pgvector::PGVectorStore;
use crate::worker::Worker;

/// Shared application state passed to all route handlers.
pub struct AppState {
    pub settings: Settings,
    pub database: Arc<dyn Database>,
    pub storage: Arc<dyn Storage>,
    pub queue: Arc<dyn MessageQueue>,
    pub search: SearchService,
}

impl AppState {
    pub fn new(settings: Settings, backends: &Backends, synthesizer: Arc<dyn AnswerSynthesizer>) -> Self {
        let search = SearchService {
            embedding_model: backends.embedding_model.clone(),
            vector_store: backends.vector_store.clone(),
            database: backends.database.clone(),
            synthesizer,
            top_k: settings.top_k,
            max_output_length: settings.max_output_length,
        };
        Self {
            database: backends.database.clone(),
            storage: backends.storage.clone(),
            queue: backends.queue.clone(),
            search,
            settings,
        }
    }
}

/// Connections shared by the API and the worker.
#[derive(Clone)]
pub struct Backends {
    pub database: Arc<dyn Database>,
    pub storage: Arc<dyn Storage>,
    pub queue: Arc<dyn MessageQueue>,
    pub embedding_model: Arc<dyn EmbeddingModel>,
    pub vector_store: Arc<dyn VectorStore>,
}

impl Backends {
    /// Connect and initialize every backend selected in `settings`.
    pub async fn connect(settings: &Settings) -> anyhow::Result<Self> {
        let database = build_database(settings).await?;
        let storage = build_storage(settings).await?;
        let queue = build_queue(settings).await?;
        let embedding_model = build_embedding_model(settings)?;
        let vector_store = build_vector_store(settings).await?;
        Ok(Self {
            database,
            storage,
            queue,
            embedding_model,
            vector_store,
        })
    }

    pub fn worker(&self, settings: &Settings) -> Worker {
        Worker {
            queue: self.queue.clone(),
            database: self.database.clone(),
            storage: self.storage.clone(),
            embedding_model: self.embedding_model.clone(),
            vector_store: self.vector_store.clone(),
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

fn postgres_uri(settings: &Settings) -> anyhow::Result<&str> {
    settings
        .postgres_uri
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("POSTGRES_URI is not set"))
}

pub async fn build_database(settings: &Settings) -> anyhow::Result<Arc<dyn Database>> {
    let database: Arc<dyn Database> = match settings.database_provider.as_str() {
        "mongodb" => {
            let uri = settings
                .mongo_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGO_URI is not set"))?;
            Arc::new(
                MongoDatabase::new(uri, &settings.mongo_database, &settings.mongo_collection)
                    .await?,
            )
        }
        "postgres" => Arc::new(PostgresDatabase::new(postgres_uri(settings)?, settings.db_pool_size).await?),
        "memory" => Arc::new(MemoryDatabase::new()),
        other => anyhow::bail!("Unknown database provider: {other}"),
    };
    database.initialize().await?;
    info!("Database initialized: {}", settings.database_provider);
    Ok(database)
}

pub async fn build_storage(settings: &Settings) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match settings.storage_provider.as_str() {
        "aws-s3" => Arc::new(S3Storage::new(
            settings.aws_access_key.as_deref().unwrap_or(""),
            settings.aws_secret_access_key.as_deref().unwrap_or(""),
            settings.aws_region.as_deref().unwrap_or("us-east-1"),
            settings.s3_bucket.as_deref().unwrap_or("rag-qna-uploads"),
            settings.s3_endpoint.as_deref(),
            settings.upload_concurrency,
        )),
        "local" => Arc::new(LocalStorage::new(&settings.storage_path)),
        other => anyhow::bail!("Unknown storage provider: {other}"),
    };
    storage.initialize().await?;
    info!("Storage initialized: {}", storage.provider_name());
    Ok(storage)
}

pub async fn build_queue(settings: &Settings) -> anyhow::Result<Arc<dyn MessageQueue>> {
    let queue: Arc<dyn MessageQueue> = match settings.queue_provider.as_str() {
        "redis" => Arc::new(RedisQueue::new(&settings.redis_url, &settings.queue_name).await?),
        "memory" => Arc::new(ChannelQueue::new()),
        other => anyhow::bail!("Unknown queue provider: {other}"),
    };
    info!("Queue initialized: {} ({})", queue.provider_name(), settings.queue_name);
    Ok(queue)
}

pub fn build_embedding_model(settings: &Settings) -> anyhow::Result<Arc<dyn EmbeddingModel>> {
    let model_name = settings.model_name(&settings.embedding_model);
    let model: Arc<dyn EmbeddingModel> = match settings.embedding_provider.as_str() {
        "openai" => Arc::new(OpenAIEmbeddingModel::new(
            &model_name,
            &settings.openai_api_key,
            settings.vector_dimensions,
            settings.embedding_base_url.as_deref(),
        )),
        #[cfg(feature = "local-embeddings")]
        "fastembed" => Arc::new(crate::embedding::fastembed::FastEmbedModel::new(
            std::path::Path::new(&settings.embedding_cache_dir),
            settings.vector_dimensions,
        )?),
        #[cfg(not(feature = "local-embeddings"))]
        "fastembed" => anyhow::bail!("fastembed provider requires the local-embeddings feature"),
        other => anyhow::bail!("Unknown embedding provider: {other}"),
    };
    info!(
        "Embedding model initialized: {} ({} dims)",
        model_name, settings.vector_dimensions
    );
    Ok(model)
}

pub async fn build_vector_store(settings: &Settings) -> anyhow::Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match settings.vector_store_provider.as_str() {
        "pgvector" => Arc::new(
            PGVectorStore::new(
                postgres_uri(settings)?,
                settings.db_pool_size,
                settings.vector_dimensions,
            )
            .await?,
        ),
        "memory" => Arc::new(MemoryVectorStore::new()),
        other => anyhow::bail!("Unknown vector store provider: {other}"),
    };
    store.initialize().await?;
    info!("Vector store initialized: {}", settings.vector_store_provider);
    Ok(store)
}

pub fn build_synthesizer(settings: &Settings) -> Arc<dyn AnswerSynthesizer> {
    let model_name = settings.model_name(&settings.completion_model);
    let completion: Arc<dyn CompletionModel> = Arc::new(OpenAICompletionModel::new(
        &model_name,
        &settings.openai_api_key,
        settings.completion_base_url.as_deref(),
        settings.max_output_length,
        settings.temperature,
    ));
    info!("Completion model initialized: {model_name}");
    Arc::new(CompletionSynthesizer::new(completion, settings.max_input_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_settings_from_str;

    fn settings(overrides: &str) -> Settings {
        let toml = format!(
            r#"
[api]
host = "127.0.0.1"
port = 8000

[database]
provider = "memory"

[storage]
provider = "local"
storage_path = "{}"

[queue]
provider = "memory"

[embedding]
model = "text-embedding-3-small"
dimensions = 4

[vector_store]
provider = "memory"

[completion]
model = "gpt-4.1-mini"
{overrides}
"#,
            std::env::temp_dir().join("rag-qna-app-test").display()
        );
        load_settings_from_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn test_connect_memory_backends() {
        let settings = settings("");
        let backends = Backends::connect(&settings).await.unwrap();
        assert_eq!(backends.queue.provider_name(), "memory");
        assert_eq!(backends.storage.provider_name(), "local");
        assert_eq!(backends.embedding_model.dimensions(), 4);

        let state = AppState::new(settings.clone(), &backends, build_synthesizer(&settings));
        assert_eq!(state.search.top_k, 10);
        assert_eq!(state.search.max_output_length, 200);

        let worker = backends.worker(&settings);
        assert_eq!(worker.chunk_size, 500);
    }

    #[tokio::test]
    async fn test_unknown_providers_are_rejected() {
        let mut settings = settings("");
        settings.queue_provider = "kafka".to_string();
        let err = build_queue(&settings).await.err().unwrap();
        assert!(err.to_string().contains("Unknown queue provider: kafka"));

        settings.embedding_provider = "cohere".to_string();
        assert!(build_embedding_model(&settings).is_err());

        settings.database_provider = "sqlite".to_string();
        assert!(build_database(&settings).await.is_err());
    }
}
