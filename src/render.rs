use crate::models::{
    FeeObservation, HistoryRecord, HourlyPattern, Prediction, Recommendation, StatsSummary,
    TxKind,
};
use crate::tracker::ComparisonEntry;

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const CHART_MAX_WIDTH: usize = 60;
const CHART_MAX_BARS: usize = 20;

/// One-line quote for the watch loop and the `current` subcommand.
pub fn current_line(obs: &FeeObservation) -> String {
    let mut line = format!(
        "[{}] Base: {:.2} gwei | Priority: {:.2} | Max: {:.2}",
        obs.network.display_name(),
        obs.base_fee_gwei,
        obs.priority_fee_gwei,
        obs.max_fee_gwei
    );

    match obs.tx_cost_usd(TxKind::Simple) {
        Some(usd) => line.push_str(&format!(" | Transfer ~ ${:.2}", usd)),
        None => line.push_str(" | Transfer: price unavailable"),
    }

    line
}

pub fn stats_block(network_name: &str, stats: &StatsSummary, hours: Option<u64>) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(60));
    match hours {
        Some(h) => lines.push(format!("GAS STATISTICS - {} (last {}h)", network_name, h)),
        None => lines.push(format!("GAS STATISTICS - {}", network_name)),
    }
    lines.push("=".repeat(60));
    lines.push(format!("Samples:      {:>10}", stats.count));
    lines.push(format!("Min / Max:    {:>10.2} / {:.2} gwei", stats.min, stats.max));
    lines.push(format!("Mean:         {:>10.2} gwei", stats.mean));
    lines.push(format!("Median:       {:>10.2} gwei", stats.median));
    lines.push(format!(
        "Percentiles:  p25 {:.2} | p75 {:.2} | p90 {:.2} | p95 {:.2}",
        stats.p25, stats.p75, stats.p90, stats.p95
    ));
    lines.push(format!("Std Dev:      {:>10.2} gwei", stats.stddev));
    match stats.coefficient_of_variation {
        Some(cv) => lines.push(format!(
            "Volatility:   {:>10} (CV {:.1}%)",
            stats.volatility.to_string(),
            cv * 100.0
        )),
        None => lines.push(format!("Volatility:   {:>10}", stats.volatility)),
    }
    lines.push("=".repeat(60));
    lines.join("\n")
}

/// One spark character per value, scaled between the series min and max.
/// A flat series renders as the lowest spark repeated.
pub fn sparkline(values: &[f64]) -> String {
    if values.is_empty() {
        return String::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return SPARKS[0].to_string().repeat(values.len());
    }

    values
        .iter()
        .map(|v| {
            let idx = ((v - min) / range * (SPARKS.len() - 1) as f64) as usize;
            SPARKS[idx.min(SPARKS.len() - 1)]
        })
        .collect()
}

/// Horizontal bar chart of base fees over time, oldest of the charted
/// tail first. Caps at the most recent 20 records.
pub fn history_chart(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "No data available".to_string();
    }

    let start = records.len().saturating_sub(CHART_MAX_BARS);
    let rows = &records[start..];
    let max_fee = rows
        .iter()
        .map(|r| r.observation.base_fee_gwei)
        .fold(0.0_f64, f64::max);

    let mut lines = Vec::new();
    lines.push("Gas Price History (base fee, gwei)".to_string());
    lines.push("=".repeat(CHART_MAX_WIDTH + 25));
    for record in rows {
        let fee = record.observation.base_fee_gwei;
        let width = if max_fee > 0.0 {
            (fee / max_fee * CHART_MAX_WIDTH as f64) as usize
        } else {
            0
        };
        lines.push(format!(
            "{} │ {} {:.1}",
            record.observation.timestamp.format("%Y-%m-%d %H:%M"),
            "█".repeat(width),
            fee
        ));
    }
    lines.push("=".repeat(CHART_MAX_WIDTH + 25));
    lines.join("\n")
}

pub fn recommendation_line(current_base_fee: f64, recommendation: Recommendation) -> String {
    format!(
        "Now ({:.2} gwei): {}",
        current_base_fee,
        recommendation.message()
    )
}

pub fn prediction_block(network_name: &str, prediction: &Prediction) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(60));
    lines.push(format!(
        "GAS PRICE PREDICTION - {} ({})",
        network_name, prediction.method
    ));
    lines.push("=".repeat(60));
    lines.push(format!(
        "Predicted Base Fee:      {:>8.2} gwei",
        prediction.base_fee_gwei
    ));
    lines.push(format!(
        "Predicted Priority Tip:  {:>8.2} gwei",
        prediction.priority_fee_gwei
    ));
    lines.push(format!(
        "Predicted Max Fee:       {:>8.2} gwei",
        prediction.max_fee_gwei
    ));
    lines.push("-".repeat(60));
    lines.push(format!(
        "Confidence:              {:>8.1}%",
        prediction.confidence * 100.0
    ));
    lines.push(format!(
        "Trend:                   {:>8}",
        prediction.trend.to_string().to_uppercase()
    ));
    lines.push(format!(
        "Sample Size:             {:>8}",
        prediction.sample_size
    ));
    lines.push("=".repeat(60));
    lines.join("\n")
}

/// Hour-of-day pattern footer for the prediction output. Hours are UTC.
pub fn hourly_pattern_block(pattern: &HourlyPattern) -> String {
    let mut lines = Vec::new();
    lines.push("-".repeat(60));
    lines.push(format!(
        "Cheapest hour:           {:02}:00 UTC ({:.2} gwei avg)",
        pattern.cheapest_hour, pattern.cheapest_hour_avg_gwei
    ));
    lines.push(format!(
        "Most expensive hour:     {:02}:00 UTC ({:.2} gwei avg)",
        pattern.most_expensive_hour, pattern.most_expensive_hour_avg_gwei
    ));
    lines.push(format!(
        "Recommendation:          {}",
        pattern.recommendation
    ));
    lines.push("=".repeat(60));
    lines.join("\n")
}

/// Comparison table sorted by USD cost for the chosen transaction kind,
/// cheapest first, with failed networks listed underneath.
pub fn comparison_table(entries: &[ComparisonEntry], tx_kind: TxKind) -> String {
    let mut lines = Vec::new();
    lines.push("=".repeat(100));
    lines.push(format!(
        "GAS PRICE COMPARISON - {} ({} gas)",
        tx_kind.label(),
        tx_kind.gas_units()
    ));
    lines.push("=".repeat(100));
    lines.push(format!(
        "{:<22} {:>12} {:>12} {:>12} {:>18} {:>12}",
        "Network", "Base (gwei)", "Tip (gwei)", "Max (gwei)", "Cost (native)", "Cost (USD)"
    ));
    lines.push("-".repeat(100));

    let mut rows: Vec<&FeeObservation> = entries
        .iter()
        .filter_map(|e| e.result.as_ref().ok())
        .collect();
    // Networks without a USD price sort last.
    rows.sort_by(|a, b| {
        let cost = |o: &FeeObservation| o.tx_cost_usd(tx_kind).unwrap_or(f64::INFINITY);
        cost(a).partial_cmp(&cost(b)).unwrap_or(std::cmp::Ordering::Equal)
    });

    for (idx, obs) in rows.iter().enumerate() {
        let usd = obs
            .tx_cost_usd(tx_kind)
            .map(|c| format!("${:.4}", c))
            .unwrap_or_else(|| "n/a".to_string());
        lines.push(format!(
            "{:>2}. {:<18} {:>12.2} {:>12.2} {:>12.2} {:>13.6} {} {:>12}",
            idx + 1,
            obs.network.display_name(),
            obs.base_fee_gwei,
            obs.priority_fee_gwei,
            obs.max_fee_gwei,
            obs.tx_cost_native(tx_kind),
            obs.network.token_symbol(),
            usd
        ));
    }

    let failures: Vec<String> = entries
        .iter()
        .filter_map(|e| {
            e.result
                .as_ref()
                .err()
                .map(|err| format!("  {}: {}", e.network.display_name(), err))
        })
        .collect();
    if !failures.is_empty() {
        lines.push("-".repeat(100));
        lines.push("ERRORS:".to_string());
        lines.extend(failures);
    }

    lines.push("=".repeat(100));
    lines.join("\n")
}

/// Cheapest network by USD cost; `None` when no network returned a price.
pub fn cheapest_entry(entries: &[ComparisonEntry], tx_kind: TxKind) -> Option<&FeeObservation> {
    entries
        .iter()
        .filter_map(|e| e.result.as_ref().ok())
        .filter(|o| o.token_price_usd.is_some())
        .min_by(|a, b| {
            let cost = |o: &FeeObservation| o.tx_cost_usd(tx_kind).unwrap_or(f64::INFINITY);
            cost(a).partial_cmp(&cost(b)).unwrap_or(std::cmp::Ordering::Equal)
        })
}
