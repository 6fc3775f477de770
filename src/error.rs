use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Why a fee source or price oracle call failed. Transient: the caller
/// (the polling loop) decides whether to retry on the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkErrorKind {
    Timeout,
    ConnectionRefused,
    MalformedResponse,
    RateLimited,
}

/// Why a notification channel delivery failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelErrorKind {
    HttpError { status: u16 },
    Io,
    Unavailable,
}

#[derive(Error, Debug)]
pub enum GasWatchError {
    #[error("network error ({kind:?}): {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("channel '{channel}' failed ({kind:?}): {message}")]
    Channel {
        channel: String,
        kind: ChannelErrorKind,
        message: String,
    },

    #[error("insufficient data: need at least {required} records, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("unknown network: {0}")]
    UnknownNetwork(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GasWatchError {
    /// Classify a reqwest failure into the transient network taxonomy.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::ConnectionRefused
        } else if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            NetworkErrorKind::RateLimited
        } else if err.is_decode() || err.status().is_some() {
            NetworkErrorKind::MalformedResponse
        } else {
            NetworkErrorKind::ConnectionRefused
        };

        GasWatchError::Network {
            kind,
            message: err.to_string(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        GasWatchError::Network {
            kind: NetworkErrorKind::MalformedResponse,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl IntoResponse for GasWatchError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            GasWatchError::Network { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            GasWatchError::UnknownNetwork(_) => (StatusCode::NOT_FOUND, "UNKNOWN_NETWORK"),
            GasWatchError::InsufficientData { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_DATA")
            }
            GasWatchError::Config(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            GasWatchError::Storage(_) | GasWatchError::Channel { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
        };

        tracing::error!(
            error = ?self,
            error_code = error_code,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}
