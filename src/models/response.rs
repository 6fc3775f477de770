use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    pub cache_hit: bool,
    pub data_source: String,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, data_source: impl Into<String>, cache_hit: bool) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
            cache_hit,
            data_source: data_source.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub rpc: bool,
    pub history_store: bool,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NetworkInfo {
    pub id: String,
    pub name: String,
    pub chain_id: u64,
    pub token_symbol: String,
    pub explorer: String,
}
