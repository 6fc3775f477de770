use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::GasWatchError;
use crate::handlers::AppState;
use crate::models::{ApiResponse, HistoryRecord, Network};
use crate::services::QueryWindow;

const DEFAULT_LIMIT: usize = 100;

#[derive(Deserialize, Debug)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(network): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<Vec<HistoryRecord>>>, GasWatchError> {
    let network: Network = network.parse()?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

    let records = state
        .store
        .query(network, QueryWindow::LastRecords(limit))
        .await?;

    Ok(Json(ApiResponse::new(records, network.id(), false)))
}
