use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rag_qna::app::{AppState, Backends, build_synthesizer};
use rag_qna::config::{config_path, load_settings_from_path};
use rag_qna::routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting rag-qna API...");

    // Load configuration.
    let path = config_path();
    let settings = load_settings_from_path(&path)?;
    info!(
        "Configuration loaded from {path}: environment={}, host={}, port={}",
        settings.environment, settings.host, settings.port
    );

    let backends = Backends::connect(&settings).await?;

    // An in-process queue is only drained by an in-process worker.
    if settings.queue_provider == "memory" {
        let worker = backends.worker(&settings);
        tokio::spawn(async move { worker.run().await });
        info!("Started in-process worker");
    }

    let synthesizer = build_synthesizer(&settings);
    let state = Arc::new(AppState::new(settings.clone(), &backends, synthesizer));

    // Build router.
    let app = routes::build_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server.
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
