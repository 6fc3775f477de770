use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GasWatchError;
use crate::models::network::{Network, TxKind};

/// One point-in-time fee reading for a network. Constructed once per poll
/// cycle by the fee source and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeObservation {
    pub network: Network,
    pub timestamp: DateTime<Utc>,
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
    pub max_fee_gwei: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_price_usd: Option<f64>,
}

impl FeeObservation {
    /// Builds an observation, deriving `max_fee = base_fee + priority_fee`.
    /// Fees must be non-negative and finite.
    pub fn new(
        network: Network,
        base_fee_gwei: f64,
        priority_fee_gwei: f64,
        token_price_usd: Option<f64>,
    ) -> Result<Self, GasWatchError> {
        for (name, value) in [("base fee", base_fee_gwei), ("priority fee", priority_fee_gwei)] {
            if !value.is_finite() || value < 0.0 {
                return Err(GasWatchError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if let Some(price) = token_price_usd {
            if !price.is_finite() || price < 0.0 {
                return Err(GasWatchError::Config(format!(
                    "token price must be a non-negative number, got {}",
                    price
                )));
            }
        }

        Ok(Self {
            network,
            timestamp: Utc::now(),
            base_fee_gwei,
            priority_fee_gwei,
            max_fee_gwei: base_fee_gwei + priority_fee_gwei,
            token_price_usd,
        })
    }

    /// Cost of a transaction at this observation's max fee, in the native token.
    pub fn tx_cost_native(&self, kind: TxKind) -> f64 {
        (self.max_fee_gwei * 1e-9) * kind.gas_units() as f64
    }

    /// Cost in USD, when the price oracle answered this cycle.
    pub fn tx_cost_usd(&self, kind: TxKind) -> Option<f64> {
        self.token_price_usd
            .map(|price| self.tx_cost_native(kind) * price)
    }
}

/// A persisted observation. `seq` is the record's position in the
/// per-network append-only sequence, assigned by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub seq: u64,
    #[serde(flatten)]
    pub observation: FeeObservation,
}
