//! Configuration management

use crate::backend::RuleSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub server: ServerConfig,
    pub rules: RuleSet,
    pub client: ClientConfig,
}

/// General settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Socket directory
    pub runtime_dir: Option<PathBuf>,

    /// Where the store snapshot and local prefs live
    pub data_dir: Option<PathBuf>,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Names the socket and the store snapshot
    pub name: String,

    /// Mirror the store to disk after every change
    pub persist: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            persist: true,
        }
    }
}

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Sessions shown on the home screen
    pub recent_limit: usize,

    /// Start `studygroup-server` when nothing answers on the socket
    pub spawn_server: bool,

    /// How long to wait for a freshly spawned server
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            recent_limit: 3,
            spawn_server: true,
            connect_timeout_ms: 2000,
        }
    }
}

impl Config {
    /// Load config from file, or return defaults if not found
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Invalid config {:?}", path))?;
        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studygroup")
            .join("config.toml")
    }

    /// Get the runtime directory for sockets
    pub fn runtime_dir(&self) -> PathBuf {
        self.general
            .runtime_dir
            .clone()
            .or_else(dirs::runtime_dir)
            .unwrap_or_else(std::env::temp_dir)
            .join("studygroup")
    }

    /// Get the data directory for the store snapshot and prefs
    pub fn data_dir(&self) -> PathBuf {
        self.general.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("studygroup")
        })
    }

    /// Get socket path for a named server
    pub fn socket_path(&self, name: &str) -> PathBuf {
        self.runtime_dir().join(format!("{}.sock", name))
    }

    /// Get the store snapshot path for a named server
    pub fn store_path(&self, name: &str) -> PathBuf {
        self.data_dir().join(format!("{}.store.json", name))
    }

    /// Get the local prefs path
    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir().join("prefs.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.name, "default");
        assert!(config.server.persist);
        assert_eq!(config.client.recent_limit, 3);
        assert!(!config.rules.host_only_writes);
        assert!(!config.rules.enforce_capacity);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [rules]
            enforce_capacity = true

            [client]
            recent_limit = 5
            "#,
        )
        .unwrap();

        assert!(config.rules.enforce_capacity);
        assert!(!config.rules.host_only_writes);
        assert_eq!(config.client.recent_limit, 5);
        assert!(config.client.spawn_server);
        assert_eq!(config.server.name, "default");
    }

    #[test]
    fn test_paths_follow_dirs() {
        let config: Config = toml::from_str(
            r#"
            [general]
            runtime_dir = "/tmp/run"
            data_dir = "/tmp/data"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.socket_path("campus"),
            PathBuf::from("/tmp/run/studygroup/campus.sock")
        );
        assert_eq!(
            config.store_path("campus"),
            PathBuf::from("/tmp/data/campus.store.json")
        );
        assert_eq!(config.prefs_path(), PathBuf::from("/tmp/data/prefs.toml"));
    }
}
