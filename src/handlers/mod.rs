pub mod gas;
pub mod health;
pub mod history;
pub mod stats;

pub use gas::*;
pub use health::*;
pub use history::*;
pub use stats::*;

use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::GasWatchError;
use crate::models::{FeeObservation, Network};
use crate::services::{FeeSource, HistoryStore};

/// Observations stay fresh for roughly one Ethereum block.
const OBSERVATION_TTL: Duration = Duration::from_secs(12);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<HistoryStore>,
    cache: Cache<Network, FeeObservation>,
    start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<HistoryStore>) -> Self {
        Self {
            config,
            store,
            cache: Cache::builder()
                .max_capacity(Network::ALL.len() as u64)
                .time_to_live(OBSERVATION_TTL)
                .build(),
            start_time: Instant::now(),
        }
    }

    /// Current observation for a network, at most one upstream fetch per
    /// TTL. Returns the observation and whether it came from the cache.
    pub async fn observe(
        &self,
        network: Network,
    ) -> Result<(FeeObservation, bool), GasWatchError> {
        if let Some(cached) = self.cache.get(&network).await {
            tracing::debug!(network = %network, "Serving cached observation");
            return Ok((cached, true));
        }

        let net_config = self
            .config
            .network_config(network, None, None)
            .map_err(|e| GasWatchError::Config(e.to_string()))?;
        let observation = FeeSource::new(net_config).fetch().await?;
        self.cache.insert(network, observation.clone()).await;
        Ok((observation, false))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
