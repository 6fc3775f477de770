use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GasWatchError;

/// Windowed base-fee statistics. Only ever produced for non-empty windows;
/// an empty window is `None` at the call site, never a zero-filled summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub stddev: f64,
    pub variance: f64,
    /// stddev / mean; omitted when the mean is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient_of_variation: Option<f64>,
    pub volatility: Volatility,
}

/// Qualitative volatility label over the coefficient of variation.
/// Cut points: below 0.15 Low, up to 0.30 Moderate, above High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Low,
    Moderate,
    High,
    Unknown,
}

impl Volatility {
    pub fn from_cv(cv: Option<f64>) -> Self {
        match cv {
            None => Volatility::Unknown,
            Some(cv) if cv < 0.15 => Volatility::Low,
            Some(cv) if cv <= 0.30 => Volatility::Moderate,
            Some(_) => Volatility::High,
        }
    }
}

impl fmt::Display for Volatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Volatility::Low => "Low",
            Volatility::Moderate => "Moderate",
            Volatility::High => "High",
            Volatility::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// "Should I transact now" label, current base fee against the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Excellent,
    Good,
    Moderate,
    High,
}

impl Recommendation {
    pub fn message(&self) -> &'static str {
        match self {
            Recommendation::Excellent => "EXCELLENT - near the window minimum",
            Recommendation::Good => "GOOD - below average, good time to transact",
            Recommendation::Moderate => "MODERATE - around average, consider waiting",
            Recommendation::High => "HIGH - above average, consider waiting",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionMethod {
    MovingAverage,
    Exponential,
    LinearRegression,
}

impl FromStr for PredictionMethod {
    type Err = GasWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "moving_average" | "sma" => Ok(PredictionMethod::MovingAverage),
            "exponential" | "ewma" => Ok(PredictionMethod::Exponential),
            "linear" | "linear_regression" => Ok(PredictionMethod::LinearRegression),
            other => Err(GasWatchError::Config(format!(
                "unknown prediction method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PredictionMethod::MovingAverage => "moving_average",
            PredictionMethod::Exponential => "exponential",
            PredictionMethod::LinearRegression => "linear_regression",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Short-horizon fee forecast from a trailing window. Ephemeral, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub method: PredictionMethod,
    pub base_fee_gwei: f64,
    pub priority_fee_gwei: f64,
    pub max_fee_gwei: f64,
    /// 0.0..=1.0, higher with more samples and a tighter fit.
    pub confidence: f64,
    pub trend: Trend,
    pub sample_size: usize,
}

/// Hour-of-day base-fee pattern: when gas has historically been cheapest
/// and how long until that hour comes around again. Hours are UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPattern {
    pub cheapest_hour: u32,
    pub cheapest_hour_avg_gwei: f64,
    pub most_expensive_hour: u32,
    pub most_expensive_hour_avg_gwei: f64,
    pub current_hour: u32,
    pub hours_until_cheapest: u32,
    pub recommendation: String,
}
