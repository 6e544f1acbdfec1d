use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, fs, path::Path, path::PathBuf, time::Duration};

use crate::{model::Units, provider::ProviderId};

pub const DEFAULT_FRESHNESS_MINUTES: u32 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which UTC offset decides the calendar day of an upstream sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    /// The host's local offset, as reported by the service clock.
    #[default]
    Local,
    /// The forecast city's offset when the provider reports one, else local.
    City,
}

/// Configuration for a single provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Overrides the provider's public endpoint, e.g. for a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, e.g. "openweather" or "weatherapi".
    pub default_provider: Option<String>,

    #[serde(default)]
    pub units: Units,

    #[serde(default)]
    pub day_boundary: DayBoundary,

    /// Forecast cache directory; the platform cache dir when absent.
    pub cache_dir: Option<PathBuf>,

    pub freshness_minutes: Option<u32>,

    pub timeout_secs: Option<u64>,

    /// Example TOML:
    /// [providers.openweather]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let s = self.default_provider.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "No default provider configured.\n\
                 Hint: run `itinerary-weather configure <provider>` (e.g. `itinerary-weather configure openweather`) first."
            )
        })?;

        ProviderId::try_from(s.as_str())
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

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

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

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
        let dirs = project_dirs()
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Convenience helper: set/replace a provider API key and optionally set default provider.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        let base_url = self
            .providers
            .remove(provider_id.as_str())
            .and_then(|existing| existing.base_url);

        self.providers
            .insert(provider_id.as_str().to_string(), ProviderConfig { api_key, base_url });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// Resolve the service settings, reading API keys from the process
    /// environment when the file has none.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        self.service_config_with_env(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::service_config`] with an explicit environment lookup.
    pub fn service_config_with_env(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ServiceConfig> {
        let provider = match self.default_provider {
            Some(_) => self.default_provider_id()?,
            None => ProviderId::default(),
        };

        let api_key = self
            .provider_api_key(provider)
            .map(str::to_string)
            .or_else(|| env(provider.api_key_env_var()))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let defaults = ServiceConfig::default();

        Ok(ServiceConfig {
            provider,
            api_key,
            base_url: self.provider_config(provider).and_then(|p| p.base_url.clone()),
            cache_dir: self.cache_dir.clone().unwrap_or(defaults.cache_dir),
            freshness: self
                .freshness_minutes
                .map(|m| chrono::Duration::minutes(i64::from(m)))
                .unwrap_or(defaults.freshness),
            request_timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            units: self.units,
            day_boundary: self.day_boundary,
        })
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "itinerary-weather", "itinerary-weather")
}

/// Platform cache directory for forecasts, or `./weather_cache` if there is none.
pub fn default_cache_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().join("forecasts"))
        .unwrap_or_else(|| PathBuf::from("weather_cache"))
}

/// Everything `ForecastService` needs, resolved once at construction.
#[derive(Clone)]
pub struct ServiceConfig {
    pub provider: ProviderId,
    /// `None` puts the service in fallback-only mode.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub cache_dir: PathBuf,
    pub freshness: chrono::Duration,
    pub request_timeout: Duration,
    pub units: Units,
    pub day_boundary: DayBoundary,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            provider: ProviderId::default(),
            api_key: None,
            base_url: None,
            cache_dir: default_cache_dir(),
            freshness: chrono::Duration::minutes(i64::from(DEFAULT_FRESHNESS_MINUTES)),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            units: Units::default(),
            day_boundary: DayBoundary::default(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("cache_dir", &self.cache_dir)
            .field("freshness", &self.freshness)
            .field("request_timeout", &self.request_timeout)
            .field("units", &self.units)
            .field("day_boundary", &self.day_boundary)
            .finish()
    }
}
