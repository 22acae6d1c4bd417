//! Leaderboard server binary.

use std::path::PathBuf;

use anyhow::Context;
use board_server::config::{Config, StoreKind, TriggerMode};
use board_server::server;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "board-server", about = "Live leaderboard over HTTP and websockets")]
struct Cli {
    /// TOML config file; environment variables are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Store backend: memory or resp.
    #[arg(long)]
    store: Option<StoreKind>,

    /// `host:port` of the RESP store.
    #[arg(long)]
    store_addr: Option<String>,

    /// Snapshot trigger: notify or interval.
    #[arg(long)]
    trigger: Option<TriggerMode>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::from_env()?,
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(store) = self.store {
            config.store = store;
        }
        if let Some(addr) = self.store_addr {
            config.store_addr = addr;
        }
        if let Some(trigger) = self.trigger {
            config.trigger = trigger;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Cli::parse().into_config().context("loading configuration")?;

    info!(
        addr = %config.socket_addr_string(),
        store = ?config.store,
        trigger = %config.trigger,
        top_k = config.top_k,
        "starting board-server"
    );

    server::run(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await
}
