use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GasWatchError;

/// Chains the tracker knows out of the box. All of them expose the
/// EIP-1559 `eth_feeHistory` method on their public endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Bsc,
    Base,
    Zksync,
    Avalanche,
}

impl Network {
    pub const ALL: [Network; 8] = [
        Network::Ethereum,
        Network::Polygon,
        Network::Arbitrum,
        Network::Optimism,
        Network::Bsc,
        Network::Base,
        Network::Zksync,
        Network::Avalanche,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Polygon => "polygon",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
            Network::Bsc => "bsc",
            Network::Base => "base",
            Network::Zksync => "zksync",
            Network::Avalanche => "avalanche",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Network::Ethereum => "Ethereum",
            Network::Polygon => "Polygon",
            Network::Arbitrum => "Arbitrum One",
            Network::Optimism => "Optimism",
            Network::Bsc => "BNB Smart Chain",
            Network::Base => "Base",
            Network::Zksync => "zkSync Era",
            Network::Avalanche => "Avalanche C-Chain",
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Polygon => 137,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
            Network::Bsc => 56,
            Network::Base => 8453,
            Network::Zksync => 324,
            Network::Avalanche => 43114,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Ethereum => "https://eth.llamarpc.com",
            Network::Polygon => "https://polygon-rpc.com",
            Network::Arbitrum => "https://arb1.arbitrum.io/rpc",
            Network::Optimism => "https://mainnet.optimism.io",
            Network::Bsc => "https://bsc-dataseed.binance.org",
            Network::Base => "https://mainnet.base.org",
            Network::Zksync => "https://mainnet.era.zksync.io",
            Network::Avalanche => "https://api.avax.network/ext/bc/C/rpc",
        }
    }

    /// CoinGecko asset id of the token gas is paid in. The L2s settle in ETH.
    pub fn coingecko_id(&self) -> &'static str {
        match self {
            Network::Ethereum
            | Network::Arbitrum
            | Network::Optimism
            | Network::Base
            | Network::Zksync => "ethereum",
            Network::Polygon => "matic-network",
            Network::Bsc => "binancecoin",
            Network::Avalanche => "avalanche-2",
        }
    }

    pub fn explorer_url(&self) -> &'static str {
        match self {
            Network::Ethereum => "https://etherscan.io",
            Network::Polygon => "https://polygonscan.com",
            Network::Arbitrum => "https://arbiscan.io",
            Network::Optimism => "https://optimistic.etherscan.io",
            Network::Bsc => "https://bscscan.com",
            Network::Base => "https://basescan.org",
            Network::Zksync => "https://explorer.zksync.io",
            Network::Avalanche => "https://snowtrace.io",
        }
    }

    pub fn token_symbol(&self) -> &'static str {
        match self {
            Network::Ethereum
            | Network::Arbitrum
            | Network::Optimism
            | Network::Base
            | Network::Zksync => "ETH",
            Network::Polygon => "MATIC",
            Network::Bsc => "BNB",
            Network::Avalanche => "AVAX",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Network {
    type Err = GasWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .iter()
            .find(|n| n.id().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| GasWatchError::UnknownNetwork(s.to_string()))
    }
}

/// Everything the fee source needs to produce one observation.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network: Network,
    pub rpc_url: String,
    pub priority_fee_gwei: f64,
    pub price_api_url: String,
}

pub const DEFAULT_PRIORITY_FEE_GWEI: f64 = 1.5;
pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

impl NetworkConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            rpc_url: network.default_rpc_url().to_string(),
            priority_fee_gwei: DEFAULT_PRIORITY_FEE_GWEI,
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
        }
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = url.into();
        self
    }

    pub fn with_priority_fee(mut self, gwei: f64) -> Self {
        self.priority_fee_gwei = gwei;
        self
    }
}

/// Reference gas budgets for common transaction shapes, used for cost
/// estimates in the comparison table and API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Simple,
    Erc20,
    Swap,
    NftMint,
    NftTransfer,
}

impl TxKind {
    pub const ALL: [TxKind; 5] = [
        TxKind::Simple,
        TxKind::Erc20,
        TxKind::Swap,
        TxKind::NftMint,
        TxKind::NftTransfer,
    ];

    pub fn gas_units(&self) -> u64 {
        match self {
            TxKind::Simple => 21_000,
            TxKind::Erc20 => 65_000,
            TxKind::Swap => 150_000,
            TxKind::NftMint => 100_000,
            TxKind::NftTransfer => 85_000,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TxKind::Simple => "Simple Transfer",
            TxKind::Erc20 => "ERC-20 Transfer",
            TxKind::Swap => "DEX Swap",
            TxKind::NftMint => "NFT Mint",
            TxKind::NftTransfer => "NFT Transfer",
        }
    }
}

impl FromStr for TxKind {
    type Err = GasWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(TxKind::Simple),
            "erc20" => Ok(TxKind::Erc20),
            "swap" => Ok(TxKind::Swap),
            "nft_mint" => Ok(TxKind::NftMint),
            "nft_transfer" => Ok(TxKind::NftTransfer),
            other => Err(GasWatchError::Config(format!(
                "unknown transaction kind: {}",
                other
            ))),
        }
    }
}
