use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::GasWatchError;
use crate::models::{FeeObservation, Network, NetworkConfig};
use crate::services::{evaluate_and_dispatch, AlertRule, FeeSource, HistoryStore};

/// Shutdown token shared by every loop. Armed once, observed via `select!`
/// so an in-flight cycle is abandoned rather than awaited out.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> (ShutdownHandle, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownHandle { tx }, Shutdown { rx })
    }

    /// Resolves when shutdown has been requested.
    pub async fn requested(&mut self) {
        // An error means the sender is gone, which also means shut down.
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Arms the token on ctrl-c.
    pub fn arm_on_ctrl_c(self) {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down gracefully...");
                self.trigger();
            }
        });
    }
}

/// What one poll cycle produced. Partial failures show up as absent
/// pieces, never as an aborted cycle.
pub struct CycleReport {
    pub observation: FeeObservation,
    pub persisted_seq: Option<u64>,
    pub alerts_fired: usize,
    pub alerts_failed: usize,
}

/// Single-network polling loop: fetch, persist, alert, repeat. The loop
/// itself never crashes on a cycle error; failed cycles are logged and the
/// next tick tries again.
pub struct Monitor {
    source: FeeSource,
    store: Option<Arc<HistoryStore>>,
    rules: Vec<AlertRule>,
    interval: Duration,
}

impl Monitor {
    pub fn new(config: NetworkConfig, interval: Duration) -> Self {
        Self {
            source: FeeSource::new(config),
            store: None,
            rules: Vec::new(),
            interval,
        }
    }

    pub fn with_store(mut self, store: Arc<HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_rules(mut self, rules: Vec<AlertRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn network(&self) -> Network {
        self.source.config().network
    }

    /// One fetch → persist → alert pass.
    pub async fn run_cycle(&self) -> Result<CycleReport, GasWatchError> {
        let observation = self.source.fetch().await?;

        // Storage failure aborts only the persistence step of this cycle.
        let persisted_seq = match &self.store {
            Some(store) => match store.append(&observation).await {
                Ok(record) => Some(record.seq),
                Err(e) => {
                    tracing::error!(
                        network = %observation.network,
                        error = %e,
                        "Failed to persist observation, continuing cycle"
                    );
                    None
                }
            },
            None => None,
        };

        let results = evaluate_and_dispatch(&observation, &self.rules).await;
        let alerts_failed = results.iter().filter(|r| r.outcome.is_err()).count();

        Ok(CycleReport {
            observation,
            persisted_seq,
            alerts_fired: results.len(),
            alerts_failed,
        })
    }

    /// Runs until shutdown. `on_cycle` renders each successful cycle.
    pub async fn run<F>(&self, mut shutdown: Shutdown, mut on_cycle: F)
    where
        F: FnMut(&CycleReport),
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            network = %self.network(),
            interval_secs = self.interval.as_secs(),
            "Monitor started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.requested() => break,
            }

            // A shutdown mid-cycle drops the in-flight RPC call; nothing
            // partial is appended or dispatched.
            tokio::select! {
                result = self.run_cycle() => match result {
                    Ok(report) => on_cycle(&report),
                    Err(e) => {
                        tracing::warn!(
                            network = %self.network(),
                            error = %e,
                            "Poll cycle failed, retrying on next interval"
                        );
                    }
                },
                _ = shutdown.requested() => break,
            }
        }

        tracing::info!(network = %self.network(), "Monitor stopped");
    }
}

/// One network's row in a comparison pass.
pub struct ComparisonEntry {
    pub network: Network,
    pub result: Result<FeeObservation, GasWatchError>,
}

/// Fetches every requested network concurrently. A failing network is
/// reported inline and never aborts the batch.
pub async fn compare_networks(configs: Vec<NetworkConfig>) -> Vec<ComparisonEntry> {
    let tasks = configs.into_iter().map(|config| async move {
        let network = config.network;
        let result = FeeSource::new(config).fetch().await;
        if let Err(e) = &result {
            tracing::warn!(network = %network, error = %e, "Comparison fetch failed");
        }
        ComparisonEntry { network, result }
    });

    join_all(tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::QueryWindow;

    fn mock_config(network: Network, server: &mockito::ServerGuard) -> NetworkConfig {
        NetworkConfig {
            network,
            rpc_url: server.url(),
            priority_fee_gwei: 1.5,
            // Unroutable price endpoint: observations degrade to no USD price.
            price_api_url: format!("{}/price", server.url()),
        }
    }

    async fn mock_fee_history(server: &mut mockito::ServerGuard, hex_wei: &str) {
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"jsonrpc":"2.0","id":1,"result":{{"baseFeePerGas":["{}"]}}}}"#,
                hex_wei
            ))
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn cycle_persists_and_reports() {
        let mut server = mockito::Server::new_async().await;
        mock_fee_history(&mut server, "0x4a817c800").await; // 20 gwei

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::new(dir.path()));

        let monitor = Monitor::new(
            mock_config(Network::Ethereum, &server),
            Duration::from_secs(60),
        )
        .with_store(store.clone());

        let report = monitor.run_cycle().await.unwrap();
        assert_eq!(report.persisted_seq, Some(0));
        assert!((report.observation.base_fee_gwei - 20.0).abs() < 1e-9);
        assert_eq!(report.alerts_fired, 0);

        let stored = store
            .query(Network::Ethereum, QueryWindow::All)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn cycle_fails_cleanly_when_rpc_is_down() {
        let server = mockito::Server::new_async().await;
        // No mock registered: the POST 501s, which is not a valid RPC reply.
        let monitor = Monitor::new(
            mock_config(Network::Ethereum, &server),
            Duration::from_secs(60),
        );

        assert!(monitor.run_cycle().await.is_err());
    }

    #[tokio::test]
    async fn shutdown_token_stops_the_loop() {
        let mut server = mockito::Server::new_async().await;
        mock_fee_history(&mut server, "0x4a817c800").await;

        let monitor = Monitor::new(
            mock_config(Network::Ethereum, &server),
            Duration::from_millis(10),
        );

        let (handle, shutdown) = Shutdown::new();
        handle.trigger();

        // Returns promptly instead of polling forever.
        tokio::time::timeout(Duration::from_secs(1), monitor.run(shutdown, |_| {}))
            .await
            .expect("monitor should stop on an armed shutdown token");
    }

    #[tokio::test]
    async fn comparison_reports_failures_inline() {
        let mut good = mockito::Server::new_async().await;
        mock_fee_history(&mut good, "0x3b9aca00").await; // 1 gwei

        let bad = mockito::Server::new_async().await;

        let entries = compare_networks(vec![
            mock_config(Network::Ethereum, &good),
            mock_config(Network::Polygon, &bad),
        ])
        .await;

        assert_eq!(entries.len(), 2);
        assert!(entries[0].result.is_ok());
        assert!(entries[1].result.is_err());
        assert_eq!(entries[1].network, Network::Polygon);
    }
}
