//! PhishLens API server

mod handlers;
mod models;
mod state;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use phishlens_config::Settings;
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Starting PhishLens API Server");

    let settings = Settings::from_env();
    let state = Arc::new(AppState::new(settings).await?);

    let app = Router::new()
        .route("/api/v1/analyze/url", post(handlers::analyze_url))
        .route("/api/v1/threat-intel/domain/:domain", get(handlers::domain_reputation))
        .route("/api/v1/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
