mod config;
mod errors;
mod extract;
mod generation;
mod jobs;
mod llm_client;
mod models;
mod retry;
mod routes;
mod state;
mod text;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generation::generator::Generator;
use crate::generation::reasoning::ReasoningDetector;
use crate::jobs::{FetchSettings, JobFetcher};
use crate::llm_client::{LlmClient, OllamaBackend};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid env values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model client (Ollama-compatible local server)
    let backend = OllamaBackend::new(&config.ollama_base_url, config.model_timeout)
        .context("Failed to build model server HTTP client")?;
    let llm = LlmClient::new(Arc::new(backend), config.backoff());
    if llm.check_connection().await {
        info!("Model server reachable at {}", config.ollama_base_url);
    } else {
        // Not fatal: the server may come up later; generation reports MODEL_UNAVAILABLE meanwhile.
        warn!("Model server not reachable at {}", config.ollama_base_url);
    }

    // Initialize job fetcher
    let fetcher = JobFetcher::new(&FetchSettings {
        timeout: config.fetch_timeout,
        max_attempts: config.fetch_max_attempts,
        backoff: config.backoff(),
    })
    .context("Failed to build job fetcher HTTP client")?;

    // Initialize reasoning detector (REASONING_MARKERS replaces the defaults)
    let detector = match &config.reasoning_markers {
        Some(markers) => ReasoningDetector::from_patterns(markers)
            .context("REASONING_MARKERS contains an invalid regex")?,
        None => ReasoningDetector::default(),
    };
    info!("Reasoning detector: {} marker pattern(s)", detector.marker_count());

    let generator = Generator::new(llm.clone(), detector, config.backoff());

    // Build app state
    let state = AppState {
        llm,
        fetcher,
        generator,
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
