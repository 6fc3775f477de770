use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::GasWatchError;
use crate::models::{FeeObservation, NetworkConfig};

const RPC_TIMEOUT: Duration = Duration::from_secs(15);
const PRICE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize, Debug)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize, Debug)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize, Debug)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// `eth_feeHistory` result. `baseFeePerGas` carries one extra trailing
/// element: the base fee of the next (pending) block.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FeeHistoryResult {
    base_fee_per_gas: Vec<String>,
    #[serde(default)]
    #[allow(dead_code)]
    oldest_block: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    gas_used_ratio: Option<Vec<f64>>,
}

/// Minimal JSON-RPC 2.0 client. Each client owns its request-id counter;
/// there is no process-global RPC state.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(RPC_TIMEOUT)
                .build()
                .unwrap_or_default(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, GasWatchError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(GasWatchError::from_reqwest)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GasWatchError::Network {
                kind: crate::error::NetworkErrorKind::RateLimited,
                message: format!("{} rate limited the request", self.url),
            });
        }

        let body: RpcResponse<T> = response
            .error_for_status()
            .map_err(GasWatchError::from_reqwest)?
            .json()
            .await
            .map_err(GasWatchError::from_reqwest)?;

        if let Some(err) = body.error {
            return Err(GasWatchError::malformed(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }

        body.result
            .ok_or_else(|| GasWatchError::malformed("missing 'result' in RPC response"))
    }

    /// Base fee of the pending block in gwei, via `eth_feeHistory(1, "latest", [])`.
    pub async fn pending_base_fee_gwei(&self) -> Result<f64, GasWatchError> {
        let history: FeeHistoryResult = self
            .call(
                "eth_feeHistory",
                serde_json::json!([1, "latest", Vec::<f64>::new()]),
            )
            .await?;

        let last = history
            .base_fee_per_gas
            .last()
            .ok_or_else(|| GasWatchError::malformed("empty 'baseFeePerGas' array"))?;

        Ok(parse_hex_quantity(last)? as f64 / 1e9)
    }
}

/// Parses an `0x`-prefixed hex quantity into wei.
fn parse_hex_quantity(s: &str) -> Result<u128, GasWatchError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| GasWatchError::malformed(format!("quantity '{}' lacks 0x prefix", s)))?;

    u128::from_str_radix(digits, 16)
        .map_err(|e| GasWatchError::malformed(format!("invalid hex quantity '{}': {}", s, e)))
}

#[derive(Deserialize, Debug)]
struct PriceEntry {
    usd: f64,
}

/// CoinGecko simple-price lookup for the network's gas token.
pub struct PriceOracle {
    http: reqwest::Client,
    api_url: String,
}

impl PriceOracle {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(PRICE_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_url: api_url.into(),
        }
    }

    pub async fn usd_price(&self, coingecko_id: &str) -> Result<f64, GasWatchError> {
        let url = format!(
            "{}?ids={}&vs_currencies=usd",
            self.api_url, coingecko_id
        );

        let body: HashMap<String, PriceEntry> = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(GasWatchError::from_reqwest)?
            .error_for_status()
            .map_err(GasWatchError::from_reqwest)?
            .json()
            .await
            .map_err(GasWatchError::from_reqwest)?;

        body.get(coingecko_id)
            .map(|entry| entry.usd)
            .ok_or_else(|| {
                GasWatchError::malformed(format!("price response missing '{}'", coingecko_id))
            })
    }
}

/// Produces one `FeeObservation` per call. No retries and no caching here;
/// both belong to the orchestration layer.
pub struct FeeSource {
    rpc: RpcClient,
    oracle: PriceOracle,
    config: NetworkConfig,
}

impl FeeSource {
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            rpc: RpcClient::new(config.rpc_url.clone()),
            oracle: PriceOracle::new(config.price_api_url.clone()),
            config,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub async fn fetch(&self) -> Result<FeeObservation, GasWatchError> {
        let base_fee = self.rpc.pending_base_fee_gwei().await?;

        // Price lookup is best-effort: its failure degrades the observation,
        // never aborts it.
        let token_price = match self
            .oracle
            .usd_price(self.config.network.coingecko_id())
            .await
        {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::warn!(
                    network = %self.config.network,
                    error = %e,
                    "Price lookup failed, continuing without USD price"
                );
                None
            }
        };

        FeeObservation::new(
            self.config.network,
            base_fee,
            self.config.priority_fee_gwei,
            token_price,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;
    use crate::models::Network;

    #[test]
    fn hex_quantities_parse() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_hex_quantity("0x4a817c800").unwrap(), 20_000_000_000);
        assert!(parse_hex_quantity("4a817c800").is_err());
        assert!(parse_hex_quantity("0xzz").is_err());
    }

    fn test_config(rpc_url: &str, price_url: &str) -> NetworkConfig {
        NetworkConfig {
            network: Network::Ethereum,
            rpc_url: rpc_url.to_string(),
            priority_fee_gwei: 1.5,
            price_api_url: price_url.to_string(),
        }
    }

    #[tokio::test]
    async fn fetch_builds_observation_from_fee_history() {
        let mut server = mockito::Server::new_async().await;

        let rpc = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            // 20 gwei pending base fee
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"oldestBlock":"0x1","baseFeePerGas":["0x3b9aca00","0x4a817c800"],"gasUsedRatio":[0.5]}}"#,
            )
            .create_async()
            .await;

        let price = server
            .mock("GET", "/price")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ethereum":{"usd":2000.0}}"#)
            .create_async()
            .await;

        let source = FeeSource::new(test_config(
            &server.url(),
            &format!("{}/price", server.url()),
        ));
        let obs = source.fetch().await.unwrap();

        assert_eq!(obs.network, Network::Ethereum);
        assert!((obs.base_fee_gwei - 20.0).abs() < 1e-9);
        assert!((obs.max_fee_gwei - 21.5).abs() < 1e-9);
        assert_eq!(obs.token_price_usd, Some(2000.0));

        rpc.assert_async().await;
        price.assert_async().await;
    }

    #[tokio::test]
    async fn price_failure_degrades_to_none() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"baseFeePerGas":["0x4a817c800"]}}"#,
            )
            .create_async()
            .await;

        server
            .mock("GET", "/price")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let source = FeeSource::new(test_config(
            &server.url(),
            &format!("{}/price", server.url()),
        ));
        let obs = source.fetch().await.unwrap();

        assert_eq!(obs.token_price_usd, None);
        assert!((obs.base_fee_gwei - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rpc_error_object_is_malformed_response() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"method not found"}}"#)
            .create_async()
            .await;

        let client = RpcClient::new(server.url());
        let err = client.pending_base_fee_gwei().await.unwrap_err();

        assert!(matches!(
            err,
            GasWatchError::Network {
                kind: NetworkErrorKind::MalformedResponse,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn empty_base_fee_array_is_rejected() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"baseFeePerGas":[]}}"#)
            .create_async()
            .await;

        let client = RpcClient::new(server.url());
        assert!(client.pending_base_fee_gwei().await.is_err());
    }

    #[tokio::test]
    async fn rate_limited_endpoint_is_classified() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/")
            .with_status(429)
            .create_async()
            .await;

        let client = RpcClient::new(server.url());
        let err = client.pending_base_fee_gwei().await.unwrap_err();

        assert!(matches!(
            err,
            GasWatchError::Network {
                kind: NetworkErrorKind::RateLimited,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn request_ids_are_per_client_and_increment() {
        let client = RpcClient::new("http://localhost:1");
        assert_eq!(client.next_id.fetch_add(1, Ordering::Relaxed), 1);
        assert_eq!(client.next_id.fetch_add(1, Ordering::Relaxed), 2);

        let other = RpcClient::new("http://localhost:1");
        assert_eq!(other.next_id.load(Ordering::Relaxed), 1);
    }
}
