use std::path::Path;
use std::str::FromStr;

use crate::error::GasWatchError;
use crate::models::HistoryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = GasWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(GasWatchError::Config(format!(
                "unsupported export format: {}",
                other
            ))),
        }
    }
}

const CSV_HEADER: &str = "timestamp,network,base_fee_gwei,priority_fee_gwei,max_fee_gwei,token_price_usd";

fn to_csv(records: &[HistoryRecord]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for record in records {
        let obs = &record.observation;
        let price = obs
            .token_price_usd
            .map(|p| p.to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            obs.timestamp.to_rfc3339(),
            obs.network,
            obs.base_fee_gwei,
            obs.priority_fee_gwei,
            obs.max_fee_gwei,
            price,
        ));
    }
    out
}

/// Writes a queried window to disk. Refuses an empty window: an empty
/// export file hides the difference between "no data" and "no fees".
pub async fn export_records(
    records: &[HistoryRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<(), GasWatchError> {
    if records.is_empty() {
        return Err(GasWatchError::Config(
            "no records to export".to_string(),
        ));
    }

    let body = match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Json => serde_json::to_string_pretty(records)
            .map_err(|e| GasWatchError::Storage(std::io::Error::other(e)))?,
    };

    tokio::fs::write(path, body).await?;
    tracing::info!(path = %path.display(), count = records.len(), "Exported history");
    Ok(())
}
