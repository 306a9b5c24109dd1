//! Application configuration management.
//!
//! Configuration lives at `~/.config/schooldash/config.json`. The backend
//! URL and anonymous key can also come from `SCHOOLDASH_URL` and
//! `SCHOOLDASH_ANON_KEY` (a `.env` file works too), which win over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_AUTH_TIMEOUT_SECS;
use crate::cache::{DEFAULT_DEDUP_TTL_SECS, DEFAULT_TTL_SECS};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "schooldash";

const CONFIG_FILE: &str = "config.json";

pub const ENV_URL: &str = "SCHOOLDASH_URL";
pub const ENV_ANON_KEY: &str = "SCHOOLDASH_ANON_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub anon_key: Option<String>,
    pub cache_ttl_secs: i64,
    pub dedup_ttl_secs: i64,
    pub auth_timeout_secs: u64,
    pub last_email: Option<String>,
    /// Directory for a daily rolling log file; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            cache_ttl_secs: DEFAULT_TTL_SECS,
            dedup_ttl_secs: DEFAULT_DEDUP_TTL_SECS,
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
            last_email: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(std::env::var(ENV_URL).ok(), std::env::var(ENV_ANON_KEY).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Non-empty values replace what the file had.
    pub fn apply_overrides(&mut self, url: Option<String>, anon_key: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend_url = Some(url.trim().to_string());
        }
        if let Some(key) = anon_key.filter(|k| !k.trim().is_empty()) {
            self.anon_key = Some(key.trim().to_string());
        }
    }

    /// Backend URL and anonymous key, both required to talk to the server.
    pub fn backend(&self) -> Result<(&str, &str)> {
        let url = self.backend_url.as_deref().with_context(|| {
            format!("Backend URL not configured - set {} or backend_url in config.json", ENV_URL)
        })?;
        let key = self.anon_key.as_deref().with_context(|| {
            format!("Anonymous key not configured - set {} or anon_key in config.json", ENV_ANON_KEY)
        })?;
        Ok((url, key))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::seconds(self.cache_ttl_secs.max(0))
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::seconds(self.dedup_ttl_secs.max(0))
    }

    pub fn auth_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auth_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the session file is kept.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir =
            dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
