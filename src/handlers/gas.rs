use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::GasWatchError;
use crate::handlers::AppState;
use crate::models::{ApiResponse, FeeObservation, Network, NetworkInfo, TxKind};

#[derive(Serialize, Debug)]
pub struct TxCost {
    pub name: &'static str,
    pub gas_units: u64,
    pub cost_native: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

#[derive(Serialize, Debug)]
pub struct GasQuote {
    #[serde(flatten)]
    pub observation: FeeObservation,
    pub tx_costs: BTreeMap<&'static str, TxCost>,
}

impl GasQuote {
    pub fn from_observation(observation: FeeObservation) -> Self {
        let tx_costs = TxKind::ALL
            .iter()
            .map(|&kind| {
                (
                    kind.label(),
                    TxCost {
                        name: kind.label(),
                        gas_units: kind.gas_units(),
                        cost_native: observation.tx_cost_native(kind),
                        cost_usd: observation.tx_cost_usd(kind),
                    },
                )
            })
            .collect();
        Self {
            observation,
            tx_costs,
        }
    }
}

pub async fn get_gas(
    State(state): State<AppState>,
    Path(network): Path<String>,
) -> Result<Json<ApiResponse<GasQuote>>, GasWatchError> {
    let network: Network = network.parse()?;

    let (observation, cache_hit) = state.observe(network).await?;

    Ok(Json(ApiResponse::new(
        GasQuote::from_observation(observation),
        network.id(),
        cache_hit,
    )))
}

pub async fn get_networks(
    State(_state): State<AppState>,
) -> Json<ApiResponse<Vec<NetworkInfo>>> {
    let networks = Network::ALL
        .iter()
        .map(|n| NetworkInfo {
            id: n.id().to_string(),
            name: n.display_name().to_string(),
            chain_id: n.chain_id(),
            token_symbol: n.token_symbol().to_string(),
            explorer: n.explorer_url().to_string(),
        })
        .collect();

    Json(ApiResponse::new(networks, "static", false))
}
