use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::GasWatchError;
use crate::models::{FeeObservation, HistoryRecord, Network};

/// Bounds a windowed read over a network's log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryWindow {
    All,
    /// Most recent N records.
    LastRecords(usize),
    /// Records observed at or after the cutoff.
    Since(DateTime<Utc>),
}

impl QueryWindow {
    /// Window covering the last `hours` hours. Rejects non-positive values
    /// and spans too large for a `chrono::Duration` instead of panicking.
    pub fn since_hours(hours: i64) -> Result<Self, GasWatchError> {
        let span = chrono::Duration::try_hours(hours)
            .filter(|_| hours > 0)
            .ok_or_else(|| {
                GasWatchError::Config(format!("invalid hours window: {}", hours))
            })?;
        Ok(QueryWindow::Since(Utc::now() - span))
    }
}

/// Durable append-only log of observations, one JSONL file per network
/// under the data directory. Appends are serialized per network; reads
/// never block an appender for longer than a single line write.
pub struct HistoryStore {
    data_dir: PathBuf,
    // Per-network append state: next sequence number, guarded so that a
    // record and its seq are assigned atomically.
    writers: Mutex<HashMap<Network, Arc<Mutex<u64>>>>,
}

impl HistoryStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            writers: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn log_path(&self, network: Network) -> PathBuf {
        self.data_dir.join(format!("{}.jsonl", network.id()))
    }

    async fn writer_state(&self, network: Network) -> Result<Arc<Mutex<u64>>, GasWatchError> {
        let mut writers = self.writers.lock().await;
        if let Some(state) = writers.get(&network) {
            return Ok(state.clone());
        }

        // First touch: the counter resumes from the number of valid lines
        // already on disk.
        let existing = self.read_observations(network).await?.len() as u64;
        let state = Arc::new(Mutex::new(existing));
        writers.insert(network, state.clone());
        Ok(state)
    }

    pub async fn append(
        &self,
        observation: &FeeObservation,
    ) -> Result<HistoryRecord, GasWatchError> {
        let state = self.writer_state(observation.network).await?;
        let mut next_seq = state.lock().await;

        tokio::fs::create_dir_all(&self.data_dir).await?;

        let mut line = serde_json::to_string(observation)
            .map_err(|e| GasWatchError::Storage(std::io::Error::other(e)))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(observation.network))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        let record = HistoryRecord {
            seq: *next_seq,
            observation: observation.clone(),
        };
        *next_seq += 1;

        tracing::debug!(
            network = %observation.network,
            seq = record.seq,
            base_fee = observation.base_fee_gwei,
            "Appended history record"
        );

        Ok(record)
    }

    /// All valid records for a network, oldest first. A malformed line
    /// (crash-truncated tail, hand-edited file) is skipped with a warning
    /// and never poisons the valid prefix.
    async fn read_observations(
        &self,
        network: Network,
    ) -> Result<Vec<FeeObservation>, GasWatchError> {
        let path = self.log_path(network);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut observations = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FeeObservation>(line) {
                Ok(obs) => observations.push(obs),
                Err(e) => {
                    tracing::warn!(
                        network = %network,
                        line = line_no + 1,
                        error = %e,
                        "Skipping malformed history line"
                    );
                }
            }
        }

        Ok(observations)
    }

    pub async fn query(
        &self,
        network: Network,
        window: QueryWindow,
    ) -> Result<Vec<HistoryRecord>, GasWatchError> {
        let records: Vec<HistoryRecord> = self
            .read_observations(network)
            .await?
            .into_iter()
            .enumerate()
            .map(|(seq, observation)| HistoryRecord {
                seq: seq as u64,
                observation,
            })
            .collect();

        let filtered = match window {
            QueryWindow::All => records,
            QueryWindow::LastRecords(n) => {
                let skip = records.len().saturating_sub(n);
                records.into_iter().skip(skip).collect()
            }
            QueryWindow::Since(cutoff) => records
                .into_iter()
                .filter(|r| r.observation.timestamp >= cutoff)
                .collect(),
        };

        Ok(filtered)
    }

    pub async fn count(&self, network: Network) -> Result<usize, GasWatchError> {
        Ok(self.read_observations(network).await?.len())
    }

    /// Drops the log for a network. The next append starts over at seq 0.
    pub async fn clear(&self, network: Network) -> Result<(), GasWatchError> {
        let path = self.log_path(network);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.writers.lock().await.remove(&network);
        tracing::info!(network = %network, "Cleared history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn obs(network: Network, base_fee: f64) -> FeeObservation {
        FeeObservation::new(network, base_fee, 1.5, None).unwrap()
    }

    #[tokio::test]
    async fn append_then_query_round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        for base_fee in [20.0, 30.0, 40.0] {
            store.append(&obs(Network::Ethereum, base_fee)).await.unwrap();
        }

        let records = store
            .query(Network::Ethereum, QueryWindow::LastRecords(3))
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].seq, 0);
        assert_eq!(records[2].seq, 2);
        let fees: Vec<f64> = records
            .iter()
            .map(|r| r.observation.base_fee_gwei)
            .collect();
        assert_eq!(fees, vec![20.0, 30.0, 40.0]);
    }

    #[tokio::test]
    async fn last_records_window_takes_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        for base_fee in [10.0, 20.0, 30.0, 40.0] {
            store.append(&obs(Network::Polygon, base_fee)).await.unwrap();
        }

        let records = store
            .query(Network::Polygon, QueryWindow::LastRecords(2))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].observation.base_fee_gwei, 30.0);
        assert_eq!(records[1].observation.base_fee_gwei, 40.0);
    }

    #[test]
    fn since_hours_rejects_out_of_range_values() {
        assert!(matches!(
            QueryWindow::since_hours(i64::MAX),
            Err(GasWatchError::Config(_))
        ));
        assert!(matches!(
            QueryWindow::since_hours(0),
            Err(GasWatchError::Config(_))
        ));
        assert!(matches!(
            QueryWindow::since_hours(-5),
            Err(GasWatchError::Config(_))
        ));
        assert!(matches!(
            QueryWindow::since_hours(24),
            Ok(QueryWindow::Since(_))
        ));
    }

    #[tokio::test]
    async fn since_window_filters_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.append(&obs(Network::Base, 5.0)).await.unwrap();
        store.append(&obs(Network::Base, 6.0)).await.unwrap();

        let future = Utc::now() + Duration::hours(1);
        let past = Utc::now() - Duration::hours(1);

        assert!(store
            .query(Network::Base, QueryWindow::Since(future))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .query(Network::Base, QueryWindow::Since(past))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn corrupt_trailing_line_does_not_poison_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.append(&obs(Network::Ethereum, 20.0)).await.unwrap();
        store.append(&obs(Network::Ethereum, 30.0)).await.unwrap();

        // Simulate a crash mid-write.
        let path = dir.path().join("ethereum.jsonl");
        let mut raw = std::fs::read_to_string(&path).unwrap();
        raw.push_str("{\"network\":\"ethereum\",\"base_fee");
        std::fs::write(&path, raw).unwrap();

        let records = store
            .query(Network::Ethereum, QueryWindow::All)
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].observation.base_fee_gwei, 30.0);

        // And the store keeps accepting appends after the valid prefix.
        let record = store.append(&obs(Network::Ethereum, 40.0)).await.unwrap();
        assert_eq!(record.seq, 2);
    }

    #[tokio::test]
    async fn networks_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.append(&obs(Network::Ethereum, 20.0)).await.unwrap();
        store.append(&obs(Network::Polygon, 80.0)).await.unwrap();

        let eth = store
            .query(Network::Ethereum, QueryWindow::All)
            .await
            .unwrap();
        assert_eq!(eth.len(), 1);
        assert_eq!(eth[0].observation.network, Network::Ethereum);
        assert_eq!(store.count(Network::Polygon).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn seq_resumes_from_existing_file() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = HistoryStore::new(dir.path());
            store.append(&obs(Network::Ethereum, 20.0)).await.unwrap();
        }

        // Fresh store over the same directory, as after a restart.
        let store = HistoryStore::new(dir.path());
        let record = store.append(&obs(Network::Ethereum, 30.0)).await.unwrap();
        assert_eq!(record.seq, 1);
    }

    #[tokio::test]
    async fn clear_resets_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.append(&obs(Network::Ethereum, 20.0)).await.unwrap();
        store.clear(Network::Ethereum).await.unwrap();

        assert_eq!(store.count(Network::Ethereum).await.unwrap(), 0);
        let record = store.append(&obs(Network::Ethereum, 25.0)).await.unwrap();
        assert_eq!(record.seq, 0);
    }

    #[tokio::test]
    async fn concurrent_appends_assign_distinct_seqs() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(&obs(Network::Ethereum, 10.0 + i as f64))
                    .await
                    .unwrap()
                    .seq
            }));
        }

        let mut seqs = Vec::new();
        for handle in handles {
            seqs.push(handle.await.unwrap());
        }
        seqs.sort_unstable();
        assert_eq!(seqs, (0..8).collect::<Vec<u64>>());
        assert_eq!(store.count(Network::Ethereum).await.unwrap(), 8);
    }
}
