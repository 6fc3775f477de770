use chrono::{DateTime, Timelike, Utc};
use std::collections::BTreeMap;

use crate::error::GasWatchError;
use crate::models::{HistoryRecord, HourlyPattern, Prediction, PredictionMethod, Trend};

/// Fewest records any method accepts.
pub const MIN_WINDOW: usize = 3;
/// Trailing window for the simple moving average.
pub const SMA_WINDOW: usize = 10;
/// EWMA smoothing factor; the most recent sample carries the most weight.
pub const EWMA_ALPHA: f64 = 0.3;

/// Fewest records for the hour-of-day pattern, one day of hourly samples.
pub const HOURLY_PATTERN_MIN: usize = 24;

/// Relative base-fee change between window halves below which the trend is
/// flat (averaging methods).
const TREND_BAND: f64 = 0.10;
/// Slope per step below this fraction of the window mean counts as stable
/// (regression method).
const SLOPE_BAND: f64 = 0.005;

/// One-step-ahead forecast over a trailing record window. Deterministic:
/// identical windows produce identical predictions.
pub fn predict(
    records: &[HistoryRecord],
    method: PredictionMethod,
) -> Result<Prediction, GasWatchError> {
    if records.len() < MIN_WINDOW {
        return Err(GasWatchError::InsufficientData {
            required: MIN_WINDOW,
            available: records.len(),
        });
    }

    let base_fees: Vec<f64> = records
        .iter()
        .map(|r| r.observation.base_fee_gwei)
        .collect();
    let priority_fees: Vec<f64> = records
        .iter()
        .map(|r| r.observation.priority_fee_gwei)
        .collect();

    match method {
        PredictionMethod::MovingAverage => Ok(moving_average(&base_fees, &priority_fees)),
        PredictionMethod::Exponential => Ok(exponential(&base_fees, &priority_fees)),
        PredictionMethod::LinearRegression => Ok(linear_regression(&base_fees, &priority_fees)),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn stddev(values: &[f64], mean: f64) -> f64 {
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// `(n / (n + 3)) * 1 / (1 + dispersion)`: rises with sample count, falls
/// with dispersion (sample or residual stddev over the mean), stays in [0,1].
fn confidence(n: usize, dispersion_stddev: f64, level: f64) -> f64 {
    let dispersion = if level > 0.0 {
        dispersion_stddev / level
    } else {
        0.0
    };
    let sample_factor = n as f64 / (n as f64 + 3.0);
    (sample_factor / (1.0 + dispersion)).clamp(0.0, 1.0)
}

/// First-half vs second-half means; a move within the band is stable.
fn half_split_trend(base_fees: &[f64]) -> Trend {
    let mid = base_fees.len() / 2;
    let first = mean(&base_fees[..mid]);
    let second = mean(&base_fees[mid..]);

    if first <= 0.0 {
        return Trend::Stable;
    }
    let change = (second - first) / first;
    if change > TREND_BAND {
        Trend::Increasing
    } else if change < -TREND_BAND {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

fn moving_average(base_fees: &[f64], priority_fees: &[f64]) -> Prediction {
    let start = base_fees.len().saturating_sub(SMA_WINDOW);
    let window = &base_fees[start..];
    let priority_window = &priority_fees[start..];

    let predicted_base = mean(window);
    let predicted_priority = mean(priority_window);
    let sd = stddev(window, predicted_base);

    Prediction {
        method: PredictionMethod::MovingAverage,
        base_fee_gwei: predicted_base,
        priority_fee_gwei: predicted_priority,
        max_fee_gwei: predicted_base + predicted_priority,
        confidence: confidence(window.len(), sd, predicted_base),
        trend: half_split_trend(base_fees),
        sample_size: window.len(),
    }
}

fn ewma(values: &[f64]) -> f64 {
    let mut acc = values[0];
    for &v in &values[1..] {
        acc = EWMA_ALPHA * v + (1.0 - EWMA_ALPHA) * acc;
    }
    acc
}

fn exponential(base_fees: &[f64], priority_fees: &[f64]) -> Prediction {
    let predicted_base = ewma(base_fees);
    let predicted_priority = ewma(priority_fees);

    // Dispersion over the recent tail, as for the moving average.
    let start = base_fees.len().saturating_sub(SMA_WINDOW);
    let tail = &base_fees[start..];
    let tail_mean = mean(tail);
    let sd = stddev(tail, tail_mean);

    Prediction {
        method: PredictionMethod::Exponential,
        base_fee_gwei: predicted_base,
        priority_fee_gwei: predicted_priority,
        max_fee_gwei: predicted_base + predicted_priority,
        confidence: confidence(base_fees.len(), sd, tail_mean),
        trend: half_split_trend(base_fees),
        sample_size: base_fees.len(),
    }
}

/// Ordinary least squares of base fee against the sample index; the
/// prediction is the fitted line one step past the last sample.
fn linear_regression(base_fees: &[f64], priority_fees: &[f64]) -> Prediction {
    let n = base_fees.len();
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(base_fees);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, &y) in base_fees.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }

    // denominator is 0 only for n == 1, excluded by MIN_WINDOW.
    let slope = numerator / denominator;
    let intercept = y_mean - slope * x_mean;

    let predicted_base = (slope * n as f64 + intercept).max(0.0);
    let predicted_priority = mean(priority_fees);

    let residual_sd = {
        let residuals: Vec<f64> = base_fees
            .iter()
            .enumerate()
            .map(|(i, &y)| y - (slope * i as f64 + intercept))
            .collect();
        stddev(&residuals, 0.0)
    };

    let trend = if y_mean > 0.0 && slope.abs() <= SLOPE_BAND * y_mean {
        Trend::Stable
    } else if slope > 0.0 {
        Trend::Increasing
    } else if slope < 0.0 {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    Prediction {
        method: PredictionMethod::LinearRegression,
        base_fee_gwei: predicted_base,
        priority_fee_gwei: predicted_priority,
        max_fee_gwei: predicted_base + predicted_priority,
        confidence: confidence(n, residual_sd, y_mean),
        trend,
        sample_size: n,
    }
}

/// Groups the window by hour of day (UTC) and picks the hours with the
/// lowest and highest average base fee. `None` below a day's worth of
/// samples; a pattern over less history would just echo noise.
pub fn hourly_pattern(records: &[HistoryRecord], now: DateTime<Utc>) -> Option<HourlyPattern> {
    if records.len() < HOURLY_PATTERN_MIN {
        return None;
    }

    let mut buckets: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = buckets
            .entry(record.observation.timestamp.hour())
            .or_insert((0.0, 0));
        entry.0 += record.observation.base_fee_gwei;
        entry.1 += 1;
    }

    let averages: Vec<(u32, f64)> = buckets
        .into_iter()
        .map(|(hour, (sum, n))| (hour, sum / n as f64))
        .collect();

    let &(cheapest_hour, cheapest_avg) = averages.iter().min_by(|a, b| a.1.total_cmp(&b.1))?;
    let &(most_expensive_hour, most_expensive_avg) =
        averages.iter().max_by(|a, b| a.1.total_cmp(&b.1))?;

    let current_hour = now.hour();
    let hours_until_cheapest = (24 + cheapest_hour - current_hour) % 24;
    let recommendation = if hours_until_cheapest > 0 {
        format!("Wait {} hours", hours_until_cheapest)
    } else {
        "Now is a good time".to_string()
    };

    Some(HourlyPattern {
        cheapest_hour,
        cheapest_hour_avg_gwei: cheapest_avg,
        most_expensive_hour,
        most_expensive_hour_avg_gwei: most_expensive_avg,
        current_hour,
        hours_until_cheapest,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeeObservation, Network};

    fn window(fees: &[f64]) -> Vec<HistoryRecord> {
        fees.iter()
            .enumerate()
            .map(|(seq, &base_fee)| HistoryRecord {
                seq: seq as u64,
                observation: FeeObservation::new(Network::Ethereum, base_fee, 1.5, None)
                    .unwrap(),
            })
            .collect()
    }

    #[test]
    fn too_few_records_fail_without_partial_work() {
        let err = predict(&window(&[10.0, 20.0]), PredictionMethod::LinearRegression)
            .unwrap_err();
        assert!(matches!(
            err,
            GasWatchError::InsufficientData {
                required: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn linear_regression_extrapolates_one_step() {
        let prediction =
            predict(&window(&[10.0, 20.0, 30.0]), PredictionMethod::LinearRegression).unwrap();
        assert!((prediction.base_fee_gwei - 40.0).abs() < 1e-9);
        assert_eq!(prediction.trend, Trend::Increasing);
        // Perfect fit: confidence is the pure sample factor n / (n + 3).
        assert!((prediction.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn linear_regression_is_clamped_at_zero() {
        let prediction =
            predict(&window(&[30.0, 15.0, 2.0]), PredictionMethod::LinearRegression).unwrap();
        assert!(prediction.base_fee_gwei >= 0.0);
        assert_eq!(prediction.trend, Trend::Decreasing);
    }

    #[test]
    fn flat_series_is_stable() {
        let prediction =
            predict(&window(&[20.0, 20.0, 20.0, 20.0]), PredictionMethod::LinearRegression)
                .unwrap();
        assert_eq!(prediction.trend, Trend::Stable);
        assert!((prediction.base_fee_gwei - 20.0).abs() < 1e-9);
    }

    #[test]
    fn moving_average_is_the_window_mean() {
        let prediction =
            predict(&window(&[20.0, 30.0, 40.0]), PredictionMethod::MovingAverage).unwrap();
        assert!((prediction.base_fee_gwei - 30.0).abs() < 1e-9);
        assert!((prediction.priority_fee_gwei - 1.5).abs() < 1e-9);
        assert!((prediction.max_fee_gwei - 31.5).abs() < 1e-9);
    }

    #[test]
    fn moving_average_uses_a_trailing_window() {
        // 12 records; only the trailing 10 should contribute.
        let fees: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        let prediction = predict(&window(&fees), PredictionMethod::MovingAverage).unwrap();
        let expected = (3..=12).sum::<i32>() as f64 / 10.0;
        assert!((prediction.base_fee_gwei - expected).abs() < 1e-9);
        assert_eq!(prediction.sample_size, 10);
    }

    #[test]
    fn ewma_weights_recent_samples_highest() {
        let rising = predict(&window(&[10.0, 10.0, 50.0]), PredictionMethod::Exponential)
            .unwrap();
        let flat = predict(&window(&[10.0, 10.0, 10.0]), PredictionMethod::Exponential)
            .unwrap();
        assert!(rising.base_fee_gwei > flat.base_fee_gwei);
        // But the EWMA never overshoots the latest sample.
        assert!(rising.base_fee_gwei < 50.0);
    }

    #[test]
    fn confidence_is_monotonic_in_sample_count() {
        let short = predict(&window(&[20.0, 20.0, 20.0]), PredictionMethod::LinearRegression)
            .unwrap();
        let long = predict(
            &window(&[20.0; 8]),
            PredictionMethod::LinearRegression,
        )
        .unwrap();
        assert!(long.confidence > short.confidence);
    }

    #[test]
    fn confidence_falls_with_dispersion() {
        let tight = predict(
            &window(&[20.0, 21.0, 20.0, 21.0]),
            PredictionMethod::MovingAverage,
        )
        .unwrap();
        let noisy = predict(
            &window(&[5.0, 60.0, 8.0, 45.0]),
            PredictionMethod::MovingAverage,
        )
        .unwrap();
        assert!(tight.confidence > noisy.confidence);
        assert!(noisy.confidence >= 0.0 && tight.confidence <= 1.0);
    }

    fn record_at(seq: u64, hour: u32, base_fee: f64) -> HistoryRecord {
        use chrono::TimeZone;
        let mut observation =
            FeeObservation::new(Network::Ethereum, base_fee, 1.5, None).unwrap();
        observation.timestamp = Utc
            .with_ymd_and_hms(2026, 8, 1 + (seq / 24) as u32, hour, 0, 0)
            .unwrap();
        HistoryRecord { seq, observation }
    }

    fn day_of_records() -> Vec<HistoryRecord> {
        (0u32..24)
            .map(|hour| {
                let fee = match hour {
                    3 => 10.0,
                    15 => 90.0,
                    _ => 50.0,
                };
                record_at(hour as u64, hour, fee)
            })
            .collect()
    }

    fn at_hour(hour: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 8, 2, hour, 30, 0).unwrap()
    }

    #[test]
    fn hourly_pattern_needs_a_day_of_samples() {
        let records: Vec<HistoryRecord> = (0..23)
            .map(|i| record_at(i, i as u32, 50.0))
            .collect();
        assert!(hourly_pattern(&records, Utc::now()).is_none());
    }

    #[test]
    fn hourly_pattern_finds_cheapest_and_priciest_hours() {
        let pattern = hourly_pattern(&day_of_records(), at_hour(1)).unwrap();

        assert_eq!(pattern.cheapest_hour, 3);
        assert!((pattern.cheapest_hour_avg_gwei - 10.0).abs() < 1e-9);
        assert_eq!(pattern.most_expensive_hour, 15);
        assert!((pattern.most_expensive_hour_avg_gwei - 90.0).abs() < 1e-9);
        assert_eq!(pattern.current_hour, 1);
        assert_eq!(pattern.hours_until_cheapest, 2);
        assert_eq!(pattern.recommendation, "Wait 2 hours");
    }

    #[test]
    fn hourly_pattern_wraps_past_midnight() {
        let pattern = hourly_pattern(&day_of_records(), at_hour(5)).unwrap();
        assert_eq!(pattern.hours_until_cheapest, 22);
    }

    #[test]
    fn hourly_pattern_at_the_cheapest_hour_recommends_now() {
        let pattern = hourly_pattern(&day_of_records(), at_hour(3)).unwrap();
        assert_eq!(pattern.hours_until_cheapest, 0);
        assert_eq!(pattern.recommendation, "Now is a good time");
    }

    #[test]
    fn hourly_pattern_averages_repeated_hours() {
        // Two days of samples for the same hours; hour 3 averages to 15.
        let mut records = day_of_records();
        for hour in 0u32..24 {
            let fee = if hour == 3 { 20.0 } else { 50.0 };
            records.push(record_at(24 + hour as u64, hour, fee));
        }

        let pattern = hourly_pattern(&records, at_hour(1)).unwrap();
        assert_eq!(pattern.cheapest_hour, 3);
        assert!((pattern.cheapest_hour_avg_gwei - 15.0).abs() < 1e-9);
    }

    #[test]
    fn identical_windows_predict_identically() {
        let w = window(&[12.0, 14.0, 13.0, 15.0]);
        for method in [
            PredictionMethod::MovingAverage,
            PredictionMethod::Exponential,
            PredictionMethod::LinearRegression,
        ] {
            let a = predict(&w, method).unwrap();
            let b = predict(&w, method).unwrap();
            assert_eq!(a, b);
        }
    }
}
