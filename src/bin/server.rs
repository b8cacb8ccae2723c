//! studygroup-server - Background daemon hosting accounts and study sessions

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use studygroup::backend::MemoryBackend;
use studygroup::config::Config;
use studygroup::server::ServerListener;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "studygroup-server")]
#[command(about = "studygroup background server daemon")]
struct Cli {
    /// Server name
    #[arg(short, long)]
    name: Option<String>,

    /// Socket path override
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Store snapshot path override
    #[arg(long)]
    data_file: Option<PathBuf>,

    /// Keep the store in memory only
    #[arg(long)]
    no_persist: bool,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load config")?,
    };
    let name = cli.name.unwrap_or_else(|| config.server.name.clone());
    let socket_path = cli.socket.unwrap_or_else(|| config.socket_path(&name));

    tracing::info!("Starting studygroup server: {}", name);

    let backend = if cli.no_persist || !config.server.persist {
        tracing::info!("Persistence disabled; store lives in memory only");
        MemoryBackend::new()
    } else {
        let data_file = cli.data_file.unwrap_or_else(|| config.store_path(&name));
        MemoryBackend::open(&data_file)
            .await
            .with_context(|| format!("Failed to open store {:?}", data_file))?
    }
    .with_rules(config.rules);

    let listener = ServerListener::new(name, socket_path, backend);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    listener.run(shutdown_rx).await
}
