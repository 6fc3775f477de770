use crate::models::{HistoryRecord, Recommendation, StatsSummary, Volatility};

/// Windowed statistics over the base fees of a record window. Returns
/// `None` for an empty window rather than a zero-filled summary.
pub fn summarize(records: &[HistoryRecord]) -> Option<StatsSummary> {
    if records.is_empty() {
        return None;
    }

    let fees: Vec<f64> = records
        .iter()
        .map(|r| r.observation.base_fee_gwei)
        .collect();

    let mut sorted = fees.clone();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let min = sorted[0];
    let max = sorted[count - 1];
    let mean = fees.iter().sum::<f64>() / count as f64;

    // Population variance over the window.
    let variance = fees.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / count as f64;
    let stddev = variance.sqrt();

    let coefficient_of_variation = if mean > 0.0 { Some(stddev / mean) } else { None };

    let p25 = percentile(&sorted, 0.25);
    let p50 = percentile(&sorted, 0.50);

    Some(StatsSummary {
        count,
        min,
        max,
        mean,
        median: p50,
        p25,
        p50,
        p75: percentile(&sorted, 0.75),
        p90: percentile(&sorted, 0.90),
        p95: percentile(&sorted, 0.95),
        stddev,
        variance,
        coefficient_of_variation,
        volatility: Volatility::from_cv(coefficient_of_variation),
    })
}

/// Percentile by linear interpolation between order statistics: the rank
/// `q * (n - 1)` is interpolated between its neighbours in the sorted sample.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }

    let weight = rank - lo as f64;
    sorted[lo] * (1.0 - weight) + sorted[hi] * weight
}

/// Where the current base fee sits inside the window: near the minimum,
/// below average, around average, or above it.
pub fn recommend(current_base_fee: f64, stats: &StatsSummary) -> Recommendation {
    if current_base_fee <= stats.min * 1.1 {
        Recommendation::Excellent
    } else if current_base_fee <= stats.mean * 0.8 {
        Recommendation::Good
    } else if current_base_fee <= stats.mean * 1.2 {
        Recommendation::Moderate
    } else {
        Recommendation::High
    }
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
    fn empty_window_yields_none() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn three_point_window_scenario() {
        let stats = summarize(&window(&[20.0, 30.0, 40.0])).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 20.0);
        assert_eq!(stats.max, 40.0);
        assert!((stats.mean - 30.0).abs() < 1e-9);
        assert!((stats.median - 30.0).abs() < 1e-9);
    }

    #[test]
    fn percentiles_are_ordered() {
        let stats = summarize(&window(&[42.0, 7.0, 19.0, 88.0, 3.0, 55.0, 21.0])).unwrap();
        assert!(stats.min <= stats.p25);
        assert!(stats.p25 <= stats.median);
        assert!(stats.median <= stats.p75);
        assert!(stats.p75 <= stats.p95);
        assert!(stats.p95 <= stats.max);
    }

    #[test]
    fn percentile_uses_linear_interpolation() {
        // Sorted sample [10, 20, 30, 40]: p25 rank is 0.75 -> 17.5.
        let stats = summarize(&window(&[10.0, 20.0, 30.0, 40.0])).unwrap();
        assert!((stats.p25 - 17.5).abs() < 1e-9);
        assert!((stats.median - 25.0).abs() < 1e-9);
        assert!((stats.p75 - 32.5).abs() < 1e-9);
    }

    #[test]
    fn single_record_window() {
        let stats = summarize(&window(&[12.5])).unwrap();
        assert_eq!(stats.min, 12.5);
        assert_eq!(stats.max, 12.5);
        assert_eq!(stats.p95, 12.5);
        assert_eq!(stats.stddev, 0.0);
        assert_eq!(stats.volatility, Volatility::Low);
    }

    #[test]
    fn cv_is_omitted_for_zero_mean() {
        let stats = summarize(&window(&[0.0, 0.0])).unwrap();
        assert_eq!(stats.coefficient_of_variation, None);
        assert_eq!(stats.volatility, Volatility::Unknown);
    }

    #[test]
    fn volatile_window_is_labelled_high() {
        let stats = summarize(&window(&[10.0, 50.0, 90.0, 15.0, 70.0])).unwrap();
        assert_eq!(stats.volatility, Volatility::High);
    }

    #[test]
    fn recommendation_bands() {
        let stats = summarize(&window(&[20.0, 30.0, 40.0])).unwrap();
        assert_eq!(recommend(21.0, &stats), Recommendation::Excellent);
        assert_eq!(recommend(23.0, &stats), Recommendation::Good);
        assert_eq!(recommend(33.0, &stats), Recommendation::Moderate);
        assert_eq!(recommend(45.0, &stats), Recommendation::High);
    }
}
