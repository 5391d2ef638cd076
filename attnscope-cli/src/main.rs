//! attnscope CLI: inspect what a causal language model attends to.
//!
//! Analyze a prompt in the terminal, render it to a standalone HTML page, or
//! serve the interactive page over HTTP.

mod commands;

use attnscope_core::AggregationMode;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// attnscope: attention weights and next-token predictions for a prompt
#[derive(Parser, Debug)]
#[command(name = "attnscope", version, about, long_about = None)]
pub struct Cli {
    /// Workspace directory (where `.attnscope/config.toml` is looked up)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Print per-token attention weights and the top next-token candidates
    Analyze {
        /// Text to analyze
        text: String,
        /// Aggregation mode: last_token_distribution or column_sum_normalized
        #[arg(short, long)]
        mode: Option<AggregationMode>,
        /// Number of candidates to list
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a standalone HTML visualization
    Render {
        /// Text to analyze
        text: String,
        /// Aggregation mode: last_token_distribution or column_sum_normalized
        #[arg(short, long)]
        mode: Option<AggregationMode>,
        /// Output file
        #[arg(short, long, default_value = "attention_viz.html")]
        output: PathBuf,
    },
    /// Serve the interactive page and the /visualize endpoint
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Load the model before accepting requests
        #[arg(long)]
        preload: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default `.attnscope/config.toml` in the workspace
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = attnscope_core::config::log_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "attnscope.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace).await
}
