use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::GasWatchError;
use crate::handlers::AppState;
use crate::models::{ApiResponse, Network, Prediction, PredictionMethod, StatsSummary};
use crate::services::{predictor, stats, QueryWindow};

#[derive(Deserialize, Debug)]
pub struct StatsParams {
    /// Time window in hours; mutually exclusive with `limit`.
    pub hours: Option<i64>,
    /// Most recent N records.
    pub limit: Option<usize>,
}

fn window_from(params: &StatsParams) -> Result<QueryWindow, GasWatchError> {
    if let Some(hours) = params.hours {
        QueryWindow::since_hours(hours)
    } else if let Some(limit) = params.limit {
        Ok(QueryWindow::LastRecords(limit))
    } else {
        Ok(QueryWindow::All)
    }
}

pub async fn get_stats(
    State(state): State<AppState>,
    Path(network): Path<String>,
    Query(params): Query<StatsParams>,
) -> Result<Json<ApiResponse<StatsSummary>>, GasWatchError> {
    let network: Network = network.parse()?;
    let records = state.store.query(network, window_from(&params)?).await?;

    let summary = stats::summarize(&records).ok_or(GasWatchError::InsufficientData {
        required: 1,
        available: 0,
    })?;

    Ok(Json(ApiResponse::new(summary, network.id(), false)))
}

#[derive(Deserialize, Debug)]
pub struct PredictParams {
    pub method: Option<String>,
    pub window: Option<usize>,
}

pub async fn get_prediction(
    State(state): State<AppState>,
    Path(network): Path<String>,
    Query(params): Query<PredictParams>,
) -> Result<Json<ApiResponse<Prediction>>, GasWatchError> {
    let network: Network = network.parse()?;
    let method: PredictionMethod = params
        .method
        .as_deref()
        .unwrap_or("moving_average")
        .parse()?;
    let window = params.window.unwrap_or(100);

    let records = state
        .store
        .query(network, QueryWindow::LastRecords(window))
        .await?;
    let prediction = predictor::predict(&records, method)?;

    Ok(Json(ApiResponse::new(prediction, network.id(), false)))
}
