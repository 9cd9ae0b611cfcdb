use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Default config file, overridable with `RAG_QNA_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "rag-qna.toml";

// ──────────────────────────── TOML structure ────────────────────────────

#[derive(Debug, Deserialize, Clone)]
pub struct TomlConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub registered_models: HashMap<String, HashMap<String, toml::Value>>,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub parser: ParserConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub provider: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_mongo_database")]
    pub mongo_database: String,
    #[serde(default = "default_mongo_collection")]
    pub mongo_collection: String,
}

fn default_pool_size() -> u32 {
    10
}
fn default_mongo_database() -> String {
    "rag-qna".to_string()
}
fn default_mongo_collection() -> String {
    "input".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub provider: String,
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    /// Custom S3-compatible endpoint (e.g. MinIO).
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: u32,
}

fn default_upload_concurrency() -> u32 {
    16
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_queue_provider")]
    pub provider: String,
    #[serde(default = "default_queue_name")]
    pub name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provider: default_queue_provider(),
            name: default_queue_name(),
        }
    }
}

fn default_queue_provider() -> String {
    "redis".to_string()
}
fn default_queue_name() -> String {
    "rag-qna-uploads".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    pub model: String,
    pub dimensions: u32,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    pub provider: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_max_output_length")]
    pub max_output_length: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_max_input_chars() -> usize {
    4096
}
fn default_max_output_length() -> u32 {
    200
}
fn default_temperature() -> f64 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParserConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    0
}

// ──────────────────────────── Resolved Settings ────────────────────────────

/// Flat settings structure resolved from TOML + environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    // API
    pub host: String,
    pub port: u16,

    // Service
    pub environment: String,

    // Registered models
    pub registered_models: HashMap<String, HashMap<String, toml::Value>>,

    // Database
    pub database_provider: String,
    pub postgres_uri: Option<String>,
    pub mongo_uri: Option<String>,
    pub mongo_database: String,
    pub mongo_collection: String,
    pub db_pool_size: u32,

    // Storage
    pub storage_provider: String,
    pub storage_path: String,
    pub aws_region: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_access_key: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub upload_concurrency: u32,

    // Queue
    pub queue_provider: String,
    pub queue_name: String,
    pub redis_url: String,

    // Embedding
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_base_url: Option<String>,
    pub embedding_cache_dir: String,
    pub vector_dimensions: u32,

    // Vector store
    pub vector_store_provider: String,
    pub top_k: usize,

    // Completion
    pub completion_model: String,
    pub completion_base_url: Option<String>,
    pub max_input_chars: usize,
    pub max_output_length: u32,
    pub temperature: f64,

    // Parser
    pub chunk_size: usize,
    pub chunk_overlap: usize,

    pub openai_api_key: String,
}

impl Settings {
    /// Resolve a model name from the registered_models table.
    pub fn resolve_model_name(&self, key: &str) -> Option<String> {
        self.registered_models
            .get(key)
            .and_then(|m| m.get("model_name"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Registered alias resolution, falling back to the raw name.
    pub fn model_name(&self, key: &str) -> String {
        self.resolve_model_name(key)
            .unwrap_or_else(|| key.to_string())
    }

    pub fn requires_postgres(&self) -> bool {
        self.database_provider == "postgres" || self.vector_store_provider == "pgvector"
    }

    fn ensure_postgres_uri(&self) -> anyhow::Result<()> {
        if self.requires_postgres() && self.postgres_uri.is_none() {
            anyhow::bail!(
                "POSTGRES_URI environment variable is required for postgres/pgvector providers"
            );
        }
        Ok(())
    }
}

/// Config path from `RAG_QNA_CONFIG`, or the default.
pub fn config_path() -> String {
    std::env::var("RAG_QNA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Load settings from a given TOML path. Useful for testing.
pub fn load_settings_from_path(path: impl AsRef<Path>) -> anyhow::Result<Settings> {
    // Load .env if present (ignore errors)
    let _ = dotenvy::dotenv();

    let content = std::fs::read_to_string(path.as_ref())?;
    load_settings_from_str(&content)
}

/// Resolve settings from TOML text plus the environment.
pub fn load_settings_from_str(content: &str) -> anyhow::Result<Settings> {
    let config: TomlConfig = toml::from_str(content)?;
    resolve_settings(config)
}

fn resolve_settings(config: TomlConfig) -> anyhow::Result<Settings> {
    let postgres_uri = std::env::var("POSTGRES_URI").ok();

    let mongo_uri = if config.database.provider == "mongodb" {
        Some(
            std::env::var("MONGO_URI")
                .map_err(|_| anyhow::anyhow!("MONGO_URI required for mongodb provider"))?,
        )
    } else {
        std::env::var("MONGO_URI").ok()
    };

    // Storage
    let (aws_access_key, aws_secret_access_key, aws_region, s3_bucket) =
        if config.storage.provider == "aws-s3" {
            let ak = std::env::var("AWS_ACCESS_KEY")
                .map_err(|_| anyhow::anyhow!("AWS_ACCESS_KEY required for aws-s3 provider"))?;
            let sk = std::env::var("AWS_SECRET_ACCESS_KEY")
                .map_err(|_| anyhow::anyhow!("AWS_SECRET_ACCESS_KEY required for aws-s3 provider"))?;
            (
                Some(ak),
                Some(sk),
                config.storage.region.clone(),
                config.storage.bucket_name.clone(),
            )
        } else {
            (None, None, None, None)
        };

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/0".to_string());

    if config.parser.chunk_size == 0 {
        anyhow::bail!("parser.chunk_size must be greater than zero");
    }
    if config.parser.chunk_overlap >= config.parser.chunk_size {
        anyhow::bail!(
            "parser.chunk_overlap ({}) must be smaller than parser.chunk_size ({})",
            config.parser.chunk_overlap,
            config.parser.chunk_size
        );
    }

    let storage_path = config
        .storage
        .storage_path
        .unwrap_or_else(|| "./storage".to_string());
    let embedding_cache_dir = config
        .embedding
        .cache_dir
        .unwrap_or_else(|| format!("{storage_path}/models"));

    let settings = Settings {
        host: config.api.host,
        port: config.api.port,
        environment: config.service.environment,
        registered_models: config.registered_models,
        database_provider: config.database.provider,
        postgres_uri,
        mongo_uri,
        mongo_database: config.database.mongo_database,
        mongo_collection: config.database.mongo_collection,
        db_pool_size: config.database.pool_size,
        storage_provider: config.storage.provider,
        storage_path,
        aws_region,
        s3_bucket,
        s3_endpoint: config.storage.endpoint,
        aws_access_key,
        aws_secret_access_key,
        upload_concurrency: config.storage.upload_concurrency,
        queue_provider: config.queue.provider,
        queue_name: config.queue.name,
        redis_url,
        embedding_provider: config.embedding.provider,
        embedding_model: config.embedding.model,
        embedding_base_url: config.embedding.base_url,
        embedding_cache_dir,
        vector_dimensions: config.embedding.dimensions,
        vector_store_provider: config.vector_store.provider,
        top_k: config.vector_store.top_k,
        completion_model: config.completion.model,
        completion_base_url: config.completion.base_url,
        max_input_chars: config.completion.max_input_chars,
        max_output_length: config.completion.max_output_length,
        temperature: config.completion.temperature,
        chunk_size: config.parser.chunk_size,
        chunk_overlap: config.parser.chunk_overlap,
        openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
    };

    settings.ensure_postgres_uri()?;
    Ok(settings)
}
