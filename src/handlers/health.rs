use axum::{extract::State, Json};
use chrono::Utc;

use crate::handlers::AppState;
use crate::models::{HealthStatus, Network};

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    // Reachability through the same cached path the quote endpoint uses,
    // so a healthy probe costs at most one upstream call per TTL.
    let rpc_ok = state.observe(Network::Ethereum).await.is_ok();
    let store_ok = tokio::fs::create_dir_all(state.store.data_dir())
        .await
        .is_ok();

    let status = if rpc_ok && store_ok {
        "healthy"
    } else if store_ok {
        "degraded"
    } else {
        "unhealthy"
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rpc: rpc_ok,
        history_store: store_ok,
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
