//! Local device storage: a few named counters and flags, plus the sign-in token
//!
//! Stored as a small TOML file next to the rest of the app's data.

use crate::backend::AuthToken;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Counter bumped every time this device creates a session
pub const SESSIONS_CREATED: &str = "sessions_created";

/// Flag set once the welcome message has been shown
pub const WELCOME_SHOWN: &str = "welcome_shown";

/// Session counts that earn a message
const MILESTONES: [(u64, &str); 4] = [
    (1, "You hosted your first study session!"),
    (5, "Five sessions hosted. Your classmates owe you one."),
    (10, "Ten sessions hosted. You're a study group regular!"),
    (25, "25 sessions hosted. Campus study legend."),
];

pub const WELCOME_MESSAGE: &str =
    "Welcome to Study Group Finder! Create a session or find one to join.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct PrefsData {
    auth_token: Option<AuthToken>,
    counters: BTreeMap<String, u64>,
    flags: BTreeMap<String, bool>,
}

/// Preferences, optionally backed by a file
#[derive(Debug, Clone, Default)]
pub struct LocalPrefs {
    path: Option<PathBuf>,
    data: PrefsData,
}

impl LocalPrefs {
    /// Preferences that live only as long as this value
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from `path`, starting empty if the file does not exist yet
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prefs {:?}", path))?;
            toml::from_str(&content).with_context(|| format!("Corrupt prefs file {:?}", path))?
        } else {
            PrefsData::default()
        };
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write back to disk (no-op for in-memory prefs)
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.data)?;
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, content).with_context(|| format!("Failed to write {:?}", tmp))?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn counter(&self, key: &str) -> u64 {
        self.data.counters.get(key).copied().unwrap_or(0)
    }

    /// Add one to a counter and return the new value
    pub fn increment(&mut self, key: &str) -> u64 {
        let value = self.data.counters.entry(key.to_string()).or_insert(0);
        *value += 1;
        *value
    }

    pub fn flag(&self, key: &str) -> bool {
        self.data.flags.get(key).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.data.flags.insert(key.to_string(), value);
    }

    pub fn auth_token(&self) -> Option<&AuthToken> {
        self.data.auth_token.as_ref()
    }

    pub fn set_auth_token(&mut self, token: Option<AuthToken>) {
        self.data.auth_token = token;
    }
}

/// Message for hitting `count` created sessions, if that count is a milestone
pub fn milestone_message(count: u64) -> Option<&'static str> {
    MILESTONES
        .iter()
        .find(|(at, _)| *at == count)
        .map(|(_, message)| *message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_counters_and_flags_default() {
        let prefs = LocalPrefs::in_memory();
        assert_eq!(prefs.counter(SESSIONS_CREATED), 0);
        assert!(!prefs.flag(WELCOME_SHOWN));
        assert!(prefs.auth_token().is_none());
    }

    #[test]
    fn test_increment() {
        let mut prefs = LocalPrefs::in_memory();
        assert_eq!(prefs.increment(SESSIONS_CREATED), 1);
        assert_eq!(prefs.increment(SESSIONS_CREATED), 2);
        assert_eq!(prefs.counter(SESSIONS_CREATED), 2);
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("prefs.toml");

        let mut prefs = LocalPrefs::load(&path)?;
        prefs.increment(SESSIONS_CREATED);
        prefs.set_flag(WELCOME_SHOWN, true);
        prefs.set_auth_token(Some(AuthToken::new("tok")));
        prefs.save()?;

        let reloaded = LocalPrefs::load(&path)?;
        assert_eq!(reloaded.counter(SESSIONS_CREATED), 1);
        assert!(reloaded.flag(WELCOME_SHOWN));
        assert_eq!(reloaded.auth_token(), Some(&AuthToken::new("tok")));
        Ok(())
    }

    #[test]
    fn test_milestones() {
        assert!(milestone_message(1).is_some());
        assert!(milestone_message(2).is_none());
        assert!(milestone_message(5).is_some());
        assert!(milestone_message(10).is_some());
        assert!(milestone_message(25).is_some());
    }
}
