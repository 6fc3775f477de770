use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::config::Config;
use crate::handlers::{
    get_gas, get_history, get_networks, get_prediction, get_stats, health_check, AppState,
};
use crate::services::HistoryStore;
use crate::tracker::Shutdown;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/networks", get(get_networks))
        .route("/api/gas/:network", get(get_gas))
        .route("/api/history/:network", get(get_history))
        .route("/api/stats/:network", get(get_stats))
        .route("/api/predict/:network", get(get_prediction))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(CorsLayer::permissive())
}

/// Runs the read-only API until the shutdown token fires.
pub async fn serve(
    config: Arc<Config>,
    store: Arc<HistoryStore>,
    mut shutdown: Shutdown,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.requested().await })
        .await?;

    Ok(())
}
