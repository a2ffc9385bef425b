//! explorer-ui - terminal checkpoint explorer
//!
//! Reads one command per line from stdin and prints the current view to
//! stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use explorer_common::config::{ConfigOverrides, ExplorerConfig, CONFIG_ENV_VAR};
use explorer_ui::location::app_url;
use explorer_ui::render::TerminalSurface;
use explorer_ui::{ExplorerSession, ExplorerSources, SessionOptions};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands: n(ext) p(rev) f(irst) l(ast) g <page> | <page> \
open <idx> s(earch) <query> b(ack) fw|forward r(efresh) q(uit)";

/// Command-line arguments for explorer-ui
#[derive(Parser, Debug)]
#[command(name = "explorer-ui")]
#[command(about = "Terminal explorer for checkpoints")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Base URL of the explorer API
    #[arg(long, env = "EXPLORER_API_BASE_URL")]
    api_base_url: Option<String>,

    /// L1 block explorer base URL
    #[arg(long, env = "EXPLORER_L1_EXPLORER_BASE_URL")]
    l1_explorer_base_url: Option<String>,

    /// L2 block explorer base URL
    #[arg(long, env = "EXPLORER_L2_EXPLORER_BASE_URL")]
    l2_explorer_base_url: Option<String>,

    /// Seconds between refreshes of the current page (0 disables)
    #[arg(long, env = "EXPLORER_REFRESH_INTERVAL_S")]
    refresh_interval_s: Option<u64>,

    /// Rows per page on the checkpoint list
    #[arg(long, env = "EXPLORER_PAGE_SIZE")]
    page_size: Option<u64>,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "EXPLORER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Location to open, e.g. `/?p=3` or `/checkpoint?p=12`
    #[arg(long, default_value = "/")]
    url: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_base_url: self.api_base_url.clone(),
            l1_explorer_base_url: self.l1_explorer_base_url.clone(),
            l2_explorer_base_url: self.l2_explorer_base_url.clone(),
            refresh_interval_s: self.refresh_interval_s,
            page_size: self.page_size,
            log_level: self.log_level.clone(),
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match ExplorerConfig::load(args.config.as_deref(), args.overrides()) {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            error!("Failed to load configuration: {}", e);
            if e.is_config_unavailable() {
                eprintln!("Configuration unavailable: {}", e);
            } else {
                eprintln!("Error: {}", e);
            }
            std::process::exit(2);
        }
    };

    init_tracing(&config.logging.level);
    info!(
        "Starting checkpoint explorer (explorer-ui) v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        api = %config.api_base_url,
        environment = %config.environment,
        page_size = config.page_size,
        refresh_s = config.refresh_interval.map(|d| d.as_secs()).unwrap_or(0),
        "Configuration loaded"
    );

    let start_url = app_url(&args.url).context("Invalid --url")?;
    let sources = ExplorerSources::http(&config).context("Failed to build API client")?;
    let options = SessionOptions::from_config(&config);

    let shutdown = CancellationToken::new();
    let (input_tx, input_rx) = mpsc::unbounded_channel();

    // stdin lines -> session; dropping the sender signals end of input
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            }
        }
        debug!("Input reader finished");
    });

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down");
                signal_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    println!("{}", HELP);
    let mut session = ExplorerSession::new(sources, options, TerminalSurface::new(std::io::stdout()));
    session.start(start_url);
    session.run(input_rx, shutdown).await;

    info!("Explorer closed");
    Ok(())
}
