use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use gaswatch::{
    cli::{Cli, Command, NetworkArgs},
    config::Config,
    models::{Network, PredictionMethod, TxKind},
    render,
    services::{
        self, AlertRule, ConsoleChannel, DesktopChannel, ExportFormat, FeeSource, HistoryStore,
        NotifyChannel, QueryWindow, WebhookChannel,
    },
    server,
    tracker::{self, Monitor, Shutdown},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gaswatch=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    match cli.command {
        Command::Current { network } => current(&config, &network, cli.json).await,
        Command::Watch {
            network,
            interval,
            threshold,
            webhooks,
            desktop,
            store,
        } => {
            watch(
                &config, &network, interval, threshold, webhooks, desktop, store, cli.json,
            )
            .await
        }
        Command::Compare {
            networks,
            tx,
            priority,
        } => compare(&config, &networks, &tx, priority, cli.json).await,
        Command::History {
            network,
            limit,
            chart,
            clear,
        } => history(&config, &network, limit, chart, clear, cli.json).await,
        Command::Stats {
            network,
            hours,
            limit,
        } => stats(&config, &network, hours, limit, cli.json).await,
        Command::Predict {
            network,
            method,
            window,
        } => predict(&config, &network, &method, window, cli.json).await,
        Command::Export {
            network,
            format,
            output,
            limit,
        } => export(&config, &network, &format, &output, limit).await,
        Command::Serve { host, port } => {
            let mut config = (*config).clone();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config).await
        }
    }
}

fn parse_networks(names: &[String]) -> Result<Vec<Network>> {
    if names.is_empty() {
        return Ok(Network::ALL.to_vec());
    }
    names
        .iter()
        .map(|n| n.parse::<Network>().context("invalid --network"))
        .collect()
}

async fn current(config: &Config, args: &NetworkArgs, json: bool) -> Result<()> {
    let network: Network = args.network.parse()?;
    let net_config = config.network_config(network, args.rpc.as_deref(), args.priority)?;

    let observation = FeeSource::new(net_config).fetch().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&observation)?);
    } else {
        println!("{}", render::current_line(&observation));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn watch(
    config: &Config,
    args: &NetworkArgs,
    interval: u64,
    threshold: Option<f64>,
    webhooks: Vec<String>,
    desktop: bool,
    store: bool,
    json: bool,
) -> Result<()> {
    let network: Network = args.network.parse()?;
    let net_config = config.network_config(network, args.rpc.as_deref(), args.priority)?;

    if interval == 0 {
        anyhow::bail!("--interval must be at least 1 second");
    }
    if let Some(t) = threshold {
        if t <= 0.0 || !t.is_finite() {
            anyhow::bail!("--threshold must be a positive number of gwei");
        }
    }

    let mut monitor = Monitor::new(net_config, Duration::from_secs(interval));

    if store {
        monitor = monitor.with_store(Arc::new(HistoryStore::new(config.data_dir.clone())));
    }

    if let Some(threshold_gwei) = threshold {
        let mut channels: Vec<Arc<dyn NotifyChannel>> = vec![Arc::new(ConsoleChannel)];
        if desktop {
            channels.push(Arc::new(DesktopChannel::default()));
        }
        for url in &webhooks {
            channels.push(Arc::new(WebhookChannel::new(url.clone())));
        }
        monitor = monitor.with_rules(vec![AlertRule {
            network,
            threshold_gwei,
            channels,
        }]);
    }

    let (handle, shutdown) = Shutdown::new();
    handle.arm_on_ctrl_c();

    monitor
        .run(shutdown, |report| {
            if json {
                match serde_json::to_string(&report.observation) {
                    Ok(line) => println!("{}", line),
                    Err(e) => tracing::error!(error = %e, "Failed to serialize observation"),
                }
            } else {
                println!("{}", render::current_line(&report.observation));
            }
            if report.alerts_failed > 0 {
                tracing::warn!(
                    fired = report.alerts_fired,
                    failed = report.alerts_failed,
                    "Some alert deliveries failed"
                );
            }
        })
        .await;

    Ok(())
}

async fn compare(
    config: &Config,
    networks: &[String],
    tx: &str,
    priority: Option<f64>,
    json: bool,
) -> Result<()> {
    let tx_kind: TxKind = tx.parse()?;
    let configs = parse_networks(networks)?
        .into_iter()
        .map(|n| config.network_config(n, None, priority))
        .collect::<Result<Vec<_>>>()?;

    let entries = tracker::compare_networks(configs).await;

    if json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| match &e.result {
                Ok(obs) => serde_json::json!({
                    "network": e.network.id(),
                    "observation": obs,
                    "cost_native": obs.tx_cost_native(tx_kind),
                    "cost_usd": obs.tx_cost_usd(tx_kind),
                }),
                Err(err) => serde_json::json!({
                    "network": e.network.id(),
                    "error": err.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", render::comparison_table(&entries, tx_kind));
        if let Some(cheapest) = render::cheapest_entry(&entries, tx_kind) {
            println!(
                "Cheapest: {} at ${:.4}",
                cheapest.network.display_name(),
                cheapest.tx_cost_usd(tx_kind).unwrap_or_default()
            );
        }
    }
    Ok(())
}

async fn history(
    config: &Config,
    network: &str,
    limit: usize,
    chart: bool,
    clear: bool,
    json: bool,
) -> Result<()> {
    let network: Network = network.parse()?;
    let store = HistoryStore::new(config.data_dir.clone());

    if clear {
        store.clear(network).await?;
        println!("Cleared history for {}", network.display_name());
        return Ok(());
    }

    let records = store
        .query(network, QueryWindow::LastRecords(limit))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No history for {}", network.display_name());
    } else if chart {
        println!("{}", render::history_chart(&records));
    } else {
        for record in &records {
            println!(
                "#{:<6} {}  {}",
                record.seq,
                record.observation.timestamp.format("%Y-%m-%d %H:%M:%S"),
                render::current_line(&record.observation)
            );
        }
    }
    Ok(())
}

async fn stats(
    config: &Config,
    network: &str,
    hours: Option<i64>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let network: Network = network.parse()?;
    let store = HistoryStore::new(config.data_dir.clone());

    let window = match (hours, limit) {
        (Some(h), _) => QueryWindow::since_hours(h).context("invalid --hours")?,
        (None, Some(n)) => QueryWindow::LastRecords(n),
        (None, None) => QueryWindow::All,
    };
    let records = store.query(network, window).await?;

    match services::stats::summarize(&records) {
        None => println!("No data for {} in the requested window", network.display_name()),
        Some(summary) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "{}",
                    render::stats_block(
                        network.display_name(),
                        &summary,
                        hours.map(|h| h as u64)
                    )
                );
                let fees: Vec<f64> = records
                    .iter()
                    .map(|r| r.observation.base_fee_gwei)
                    .collect();
                println!("Trend: {}", render::sparkline(&fees));
                if let Some(last) = records.last() {
                    let rec = services::stats::recommend(
                        last.observation.base_fee_gwei,
                        &summary,
                    );
                    println!(
                        "{}",
                        render::recommendation_line(last.observation.base_fee_gwei, rec)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn predict(
    config: &Config,
    network: &str,
    method: &str,
    window: usize,
    json: bool,
) -> Result<()> {
    let network: Network = network.parse()?;
    let method: PredictionMethod = method.parse()?;
    let store = HistoryStore::new(config.data_dir.clone());

    let records = store
        .query(network, QueryWindow::LastRecords(window))
        .await?;
    let prediction = services::predictor::predict(&records, method)?;

    let pattern = services::predictor::hourly_pattern(&records, chrono::Utc::now());

    if json {
        let mut value = serde_json::to_value(&prediction)?;
        if let Some(pattern) = &pattern {
            value["hourly_pattern"] = serde_json::to_value(pattern)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "{}",
            render::prediction_block(network.display_name(), &prediction)
        );
        if let Some(pattern) = &pattern {
            println!("{}", render::hourly_pattern_block(pattern));
        }
    }
    Ok(())
}

async fn export(
    config: &Config,
    network: &str,
    format: &str,
    output: &std::path::Path,
    limit: Option<usize>,
) -> Result<()> {
    let network: Network = network.parse()?;
    let format: ExportFormat = format.parse()?;
    let store = HistoryStore::new(config.data_dir.clone());

    let window = match limit {
        Some(n) => QueryWindow::LastRecords(n),
        None => QueryWindow::All,
    };
    let records = store.query(network, window).await?;

    services::export_records(&records, format, output).await?;
    println!("Exported {} records to {}", records.len(), output.display());
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let config = Arc::new(config);
    let store = Arc::new(HistoryStore::new(config.data_dir.clone()));

    tracing::info!("Starting gaswatch API v{}", env!("CARGO_PKG_VERSION"));

    let (handle, shutdown) = Shutdown::new();
    handle.arm_on_ctrl_c();

    server::serve(config, store, shutdown).await
}
