//! HTTP server assembly

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use sqlx::PgPool;

use crate::adapters::{DocumentIntelligenceClient, FrankfurterClient};
use crate::config::Config;
use crate::features::{self, FeatureState};
use crate::middleware;
use crate::pipeline::PipelineOrchestrator;
use crate::progress::ProgressHub;
use crate::store::PgJobStore;

/// Invoice model identifier for the document-intelligence service.
const INVOICE_MODEL_ID: &str = "prebuilt-invoice";

/// Wire adapters, store, and orchestrator into the shared feature state.
pub fn build_state(config: &Config, pool: PgPool) -> FeatureState {
    let store = Arc::new(PgJobStore::new(pool));
    let hub = Arc::new(ProgressHub::new());
    let extractor = Arc::new(DocumentIntelligenceClient::new(
        config.extraction.endpoint.clone(),
        config.extraction.api_key.clone(),
        INVOICE_MODEL_ID,
    ));
    let rates = Arc::new(FrankfurterClient::new(config.rates.base_url.clone()));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        store.clone(),
        extractor,
        rates,
        hub.clone(),
        config.uploads.reports_dir.clone(),
        Duration::from_secs(config.rates.timeout_secs),
    ));

    FeatureState {
        store,
        hub,
        orchestrator,
        uploads: config.uploads.clone(),
    }
}

/// Create the application router with all routes and middleware
pub fn create_router(state: FeatureState, config: &Config) -> Router {
    let api_v1 = features::router(state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

pub async fn serve(config: Config, pool: PgPool) -> anyhow::Result<()> {
    let state = build_state(&config, pool);
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Factura Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
