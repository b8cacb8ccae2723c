//! Client - connects to the server and drives the app from the command line

mod commands;
mod render;

pub use commands::{run, Command, SessionArgs};
pub use render::error as render_error;

use crate::app::App;
use crate::backend::RemoteBackend;
use crate::config::Config;
use crate::prefs::LocalPrefs;
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::process::{Command as Process, Stdio};
use std::time::Duration;
use tokio::time::sleep;

const CONNECT_POLL: Duration = Duration::from_millis(100);

/// Connect to the named server, spawning it first if nothing answers
pub async fn connect(
    config: &Config,
    config_file: Option<&Path>,
    name: &str,
) -> Result<RemoteBackend> {
    let socket_path = config.socket_path(name);

    if let Ok(backend) = RemoteBackend::connect(&socket_path).await {
        tracing::info!("Connected to server '{}'", name);
        return Ok(backend);
    }

    if !config.client.spawn_server {
        return Err(anyhow!(
            "No server '{}' is running at {:?}",
            name,
            socket_path
        ));
    }

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create runtime dir {:?}", parent))?;
    }

    tracing::info!("Spawning server '{}'", name);
    let exe = std::env::current_exe()?
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("studygroup-server");

    let server_bin = if exe.exists() {
        exe.to_string_lossy().to_string()
    } else {
        "studygroup-server".to_string()
    };

    let mut server = Process::new(server_bin);
    server
        .arg("--name")
        .arg(name)
        .arg("--socket")
        .arg(&socket_path);
    if let Some(path) = config_file {
        server.arg("--config").arg(path);
    }
    server
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to spawn studygroup-server")?;

    // Wait for the socket to answer
    let attempts = (config.client.connect_timeout_ms / CONNECT_POLL.as_millis() as u64).max(1);
    for _ in 0..attempts {
        sleep(CONNECT_POLL).await;
        if let Ok(backend) = RemoteBackend::connect(&socket_path).await {
            tracing::info!("Connected to server '{}'", name);
            return Ok(backend);
        }
    }
    Err(anyhow!("Timed out waiting for server '{}' to start", name))
}

/// Build the app over a server connection, restoring any saved sign-in
pub async fn open(
    config: &Config,
    config_file: Option<&Path>,
    name: &str,
) -> Result<App<RemoteBackend>> {
    let backend = connect(config, config_file, name).await?;
    let prefs = LocalPrefs::load(config.prefs_path())?;

    let mut app = App::new(backend, prefs).with_recent_limit(config.client.recent_limit);
    if let Some(user) = app.restore().await? {
        tracing::debug!("Signed in as {}", user.email);
    }
    Ok(app)
}
