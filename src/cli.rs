use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Multi-network gas monitor: live quotes, history, statistics,
/// predictions and threshold alerts over public EIP-1559 endpoints.
#[derive(Parser, Debug)]
#[command(name = "gaswatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Emit JSON instead of formatted text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// Network to query.
    #[arg(long, default_value = "ethereum")]
    pub network: String,

    /// Override the RPC endpoint URL.
    #[arg(long)]
    pub rpc: Option<String>,

    /// Priority tip in gwei added on top of the base fee.
    #[arg(long)]
    pub priority: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch and print the current gas quote once.
    Current {
        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Poll a network on an interval; optionally persist and alert.
    Watch {
        #[command(flatten)]
        network: NetworkArgs,

        /// Seconds between polls.
        #[arg(long, default_value_t = 30)]
        interval: u64,

        /// Alert when the base fee drops strictly below this (gwei).
        #[arg(long)]
        threshold: Option<f64>,

        /// Webhook URL to alert (repeatable; Slack/Discord/Teams shaped).
        #[arg(long = "webhook")]
        webhooks: Vec<String>,

        /// Also send OS desktop notifications.
        #[arg(long)]
        desktop: bool,

        /// Append each observation to the history store.
        #[arg(long)]
        store: bool,
    },

    /// Fetch several networks concurrently and rank them by cost.
    Compare {
        /// Networks to include (default: all supported).
        #[arg(long = "network")]
        networks: Vec<String>,

        /// Transaction kind to price (simple, erc20, swap, nft_mint, nft_transfer).
        #[arg(long, default_value = "simple")]
        tx: String,

        /// Priority tip in gwei.
        #[arg(long)]
        priority: Option<f64>,
    },

    /// Print stored observations for a network.
    History {
        /// Network to read.
        #[arg(long, default_value = "ethereum")]
        network: String,

        /// Most recent N records.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Render an ASCII bar chart instead of the record list.
        #[arg(long)]
        chart: bool,

        /// Drop all stored records for the network instead of printing.
        #[arg(long)]
        clear: bool,
    },

    /// Windowed statistics over stored history.
    Stats {
        #[arg(long, default_value = "ethereum")]
        network: String,

        /// Restrict to the last N hours.
        #[arg(long)]
        hours: Option<i64>,

        /// Restrict to the most recent N records.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Forecast the next reading from stored history.
    Predict {
        #[arg(long, default_value = "ethereum")]
        network: String,

        /// moving_average, exponential, or linear_regression.
        #[arg(long, default_value = "moving_average")]
        method: String,

        /// Trailing records to feed the model.
        #[arg(long, default_value_t = 100)]
        window: usize,
    },

    /// Export stored history to a file.
    Export {
        #[arg(long, default_value = "ethereum")]
        network: String,

        /// csv or json.
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output path.
        #[arg(long)]
        output: PathBuf,

        /// Most recent N records (default: everything).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Serve the read-only HTTP API.
    Serve {
        /// Bind host (overrides GASWATCH_HOST).
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides GASWATCH_PORT).
        #[arg(long)]
        port: Option<u16>,
    },
}
