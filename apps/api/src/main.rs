mod config;
mod delivery;
mod errors;
mod generation;
mod history;
mod llm_client;
mod models;
mod routes;
mod settings;
mod state;
mod storage;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::build_http_client;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::SledStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed ports)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SEO API v{}", env!("CARGO_PKG_VERSION"));

    // Open the local store for settings and history
    let store = SledStore::open(&config.data_dir)?;

    // Shared HTTP client for OpenRouter and Google
    let http = build_http_client()?;
    info!(
        "HTTP client initialized (default model: {}, Google export: {})",
        config.openrouter_model,
        if config.skip_google_apis { "disabled" } else { "when configured" }
    );

    let state = AppState {
        store: Arc::new(store),
        http,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
