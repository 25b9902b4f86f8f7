//! Client settings file (`settings.json`).

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the configured API base URL.
pub const API_URL_ENV: &str = "TASKIN_API_URL";

/// Main application settings container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppSettings {
    /// Remote API settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Background synchronization settings
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    /// Base URL of the REST API, including the `/api` prefix
    pub base_url: String,
    /// Timeout applied to ordinary API requests, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Background synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncSettings {
    /// Pause between consecutive remote calls while draining, in milliseconds
    pub drain_delay_ms: u64,
    /// Health probe interval while work is pending, in seconds
    pub health_check_interval_secs: u64,
    /// Time allowed for a health probe before the server counts as unreachable
    pub health_check_timeout_ms: u64,
    /// Background poll interval, in seconds
    pub poll_interval_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            drain_delay_ms: 250,
            health_check_interval_secs: 5,
            health_check_timeout_ms: 2000,
            poll_interval_secs: 30,
        }
    }
}

/// Reads and writes `settings.json` in the data directory.
pub struct SettingsManager {
    settings_path: PathBuf,
    current: AppSettings,
}

impl SettingsManager {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join("settings.json"),
            current: AppSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    /// Load the settings file. A missing or unreadable file yields defaults.
    pub fn load(&mut self) -> Result<&AppSettings> {
        self.current = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            Self::parse_or_default(&content)
        } else {
            AppSettings::default()
        };
        Ok(&self.current)
    }

    fn parse_or_default(content: &str) -> AppSettings {
        match serde_json::from_str::<AppSettings>(content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    /// Write the current settings, creating the data directory if needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    /// Apply `TASKIN_API_URL` on top of the loaded settings.
    pub fn apply_env_overrides(&mut self) -> &AppSettings {
        let url = std::env::var(API_URL_ENV).ok();
        self.override_base_url(url)
    }

    fn override_base_url(&mut self, url: Option<String>) -> &AppSettings {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!("Using API base URL from {}", API_URL_ENV);
            self.current.server.base_url = url;
        }
        &self.current
    }
}
