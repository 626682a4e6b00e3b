mod assembler;
mod config;
mod error;
mod llm;
mod models;
mod planner;
mod prompt;
mod recovery;
mod routes;
mod search;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::llm::GeminiClient;
use crate::planner::TripPlanner;
use crate::routes::AppState;
use crate::search::{HotPepperClient, RakutenClient};
use crate::store::{FileStore, MemoryStore, PlanStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    if config.demo_mode() {
        tracing::warn!("GEMINI_API_KEY is not set; every plan will use the placeholder itinerary");
    }
    tracing::info!(
        model = %config.gemini_model,
        timeout = ?config.generation_timeout,
        "Configured generator"
    );

    let store: Arc<dyn PlanStore> = match &config.plans_file {
        Some(path) => Arc::new(
            FileStore::open(path)
                .await
                .with_context(|| format!("opening plan store at {}", path.display()))?,
        ),
        None => Arc::new(MemoryStore::new()),
    };

    let planner = TripPlanner::new(
        Arc::new(GeminiClient::new(
            config.gemini_api_key.clone(),
            config.gemini_api_base.clone(),
            config.gemini_model.clone(),
        )),
        Arc::new(HotPepperClient::new(config.hotpepper_api_key.clone())),
        Arc::new(RakutenClient::new(config.rakuten_application_id.clone())),
        config.generation_timeout,
    );

    let state = AppState {
        store,
        planner: Arc::new(planner),
        demo_mode: config.demo_mode(),
    };

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
