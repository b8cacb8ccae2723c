//! studygroup - find, host and join campus study sessions

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use studygroup::client::{self, Command};
use studygroup::config::Config;
use studygroup::error::AppError;

#[derive(Parser)]
#[command(name = "studygroup")]
#[command(about = "Find, host and join campus study sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server name to connect to
    #[arg(short, long)]
    server: Option<String>,
}

async fn run(cli: Cli) -> Result<String> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load config")?,
    };
    let name = cli.server.unwrap_or_else(|| config.server.name.clone());

    let mut app = client::open(&config, cli.config.as_deref(), &name).await?;
    Ok(client::run(&mut app, cli.command).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout is the rendered screen
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<AppError>() {
                Some(app_err) => eprintln!("{}", client::render_error(app_err)),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}
