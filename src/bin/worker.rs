use tracing::info;
use tracing_subscriber::EnvFilter;

use rag_qna::app::Backends;
use rag_qna::config::{config_path, load_settings_from_path};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = config_path();
    let settings = load_settings_from_path(&path)?;
    info!("Starting rag-qna worker (config {path})");

    if settings.queue_provider == "memory" {
        anyhow::bail!(
            "queue.provider = \"memory\" only works inside the API process; use \"redis\" for a standalone worker"
        );
    }

    let backends = Backends::connect(&settings).await?;
    let worker = backends.worker(&settings);

    tokio::select! {
        _ = worker.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received");
        }
    }

    info!("Worker stopped");
    Ok(())
}
