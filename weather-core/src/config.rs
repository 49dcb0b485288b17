use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveTime;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::ProviderId;

const SUMMARY_TIME_FORMAT: &str = "%H:%M";

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Alert rule: `consecutive_updates` most recent samples strictly above `threshold_c`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub threshold_c: f64,
    pub consecutive_updates: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { threshold_c: 35.0, consecutive_updates: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Wall-clock time (UTC, `HH:MM`) of the daily summary.
    pub time: String,

    /// Where to write the summary chart. No chart is drawn when unset.
    pub chart: Option<PathBuf>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self { time: "23:59".to_string(), chart: None }
    }
}

/// Credentials and addressing for the alert relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub relay_url: String,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub recipient: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Optional default provider id, e.g. "openweather" or "weatherapi".
    pub default_provider: Option<String>,

    /// Location names passed verbatim to the provider.
    pub locations: Vec<String>,

    /// Seconds between two sampling cycles.
    pub interval_secs: u64,

    /// SQLite database file. Defaults to the platform data directory.
    pub database: Option<PathBuf>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    pub providers: HashMap<String, ProviderConfig>,

    pub alert: AlertConfig,

    pub summary: SummaryConfig,

    /// Alerts are only logged when this section is absent.
    pub notifier: Option<NotifierConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            locations: Vec::new(),
            interval_secs: 300,
            database: None,
            providers: HashMap::new(),
            alert: AlertConfig::default(),
            summary: SummaryConfig::default(),
            notifier: None,
        }
    }
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let s = self.default_provider.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "No default provider configured.\n\
                 Hint: run `weather-monitor configure <provider>` (e.g. `weather-monitor configure openweather`) first."
            )
        })?;

        ProviderId::try_from(s.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn summary_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.summary.time, SUMMARY_TIME_FORMAT).with_context(|| {
            format!("Invalid summary time '{}', expected HH:MM", self.summary.time)
        })
    }

    /// Check the values the scheduler and alert evaluator depend on.
    pub fn validate(&self) -> Result<()> {
        if self.locations.is_empty() {
            bail!("No locations configured. Add `locations = [\"...\"]` to the config file.");
        }
        if self.interval_secs == 0 {
            bail!("`interval_secs` must be at least 1");
        }
        if self.alert.consecutive_updates == 0 {
            bail!("`alert.consecutive_updates` must be at least 1");
        }
        if !self.alert.threshold_c.is_finite() {
            bail!("`alert.threshold_c` must be a finite number");
        }
        self.summary_time()?;
        Ok(())
    }

    /// Load config from `path`, or return an empty default if it doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Configured database path, falling back to `weather.db` in the data directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("weather.db")),
        }
    }

    /// Convenience helper: set/replace a provider API key and optionally set default provider.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.insert(provider_id.as_str().to_string(), ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "weather-monitor", "weather-monitor")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
