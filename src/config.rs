use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::models::{Network, NetworkConfig, DEFAULT_PRICE_API_URL, DEFAULT_PRIORITY_FEE_GWEI};

/// Process-level settings. Per-run knobs (network, threshold, interval)
/// come from CLI flags; the environment supplies the durable ones and can
/// pin a custom RPC endpoint per network.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub priority_fee_gwei: f64,
    pub price_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let data_dir = match std::env::var("GASWATCH_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::home_dir()
                .context("cannot determine home directory; set GASWATCH_DATA_DIR")?
                .join(".gaswatch"),
        };

        let config = Self {
            data_dir,
            host: std::env::var("GASWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("GASWATCH_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid GASWATCH_PORT")?,
            priority_fee_gwei: std::env::var("GASWATCH_PRIORITY_FEE")
                .map(|v| v.parse::<f64>())
                .unwrap_or(Ok(DEFAULT_PRIORITY_FEE_GWEI))
                .context("Invalid GASWATCH_PRIORITY_FEE")?,
            price_api_url: std::env::var("GASWATCH_PRICE_API_URL")
                .unwrap_or_else(|_| DEFAULT_PRICE_API_URL.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.priority_fee_gwei < 0.0 || !self.priority_fee_gwei.is_finite() {
            bail!("GASWATCH_PRIORITY_FEE cannot be negative");
        }
        if !self.price_api_url.starts_with("http") {
            bail!("GASWATCH_PRICE_API_URL must be an HTTP(S) URL");
        }
        Ok(())
    }

    /// RPC endpoint for a network: `GASWATCH_RPC_<NETWORK>` when set,
    /// else the built-in public endpoint.
    pub fn rpc_url_for(&self, network: Network) -> String {
        let var = format!("GASWATCH_RPC_{}", network.id().to_uppercase());
        std::env::var(var).unwrap_or_else(|_| network.default_rpc_url().to_string())
    }

    /// Assembles the fee-source config for one network, applying any
    /// CLI-level overrides on top of the environment.
    pub fn network_config(
        &self,
        network: Network,
        rpc_override: Option<&str>,
        priority_override: Option<f64>,
    ) -> Result<NetworkConfig> {
        let priority = priority_override.unwrap_or(self.priority_fee_gwei);
        if priority < 0.0 || !priority.is_finite() {
            bail!("priority fee cannot be negative");
        }

        let rpc_url = match rpc_override {
            Some(url) => url.to_string(),
            None => self.rpc_url_for(network),
        };
        if !rpc_url.starts_with("http") {
            bail!("RPC endpoint must be an HTTP(S) URL: {}", rpc_url);
        }

        Ok(NetworkConfig {
            network,
            rpc_url,
            priority_fee_gwei: priority,
            price_api_url: self.price_api_url.clone(),
        })
    }
}
