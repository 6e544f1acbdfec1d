use crate::{
    config::ServiceConfig,
    model::UpstreamForecast,
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderId {
    #[default]
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }

    /// Environment variable consulted when the config file has no key.
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OPENWEATHER_API_KEY",
            ProviderId::WeatherApi => "WEATHERAPI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => openweather::DEFAULT_BASE_URL,
            ProviderId::WeatherApi => weatherapi::DEFAULT_BASE_URL,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// Upstream forecast source: a location name in, raw timestamped samples out.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn fetch_forecast(&self, location: &str) -> anyhow::Result<UpstreamForecast>;
}

/// Construct the configured provider, or `None` when no API key is available.
pub fn provider_from_config(
    settings: &ServiceConfig,
) -> anyhow::Result<Option<Box<dyn WeatherProvider>>> {
    let Some(api_key) = settings.api_key.as_deref() else {
        return Ok(None);
    };

    let base_url = settings
        .base_url
        .clone()
        .unwrap_or_else(|| settings.provider.default_base_url().to_string());

    let boxed: Box<dyn WeatherProvider> = match settings.provider {
        ProviderId::OpenWeather => Box::new(OpenWeatherProvider::new(
            api_key.to_owned(),
            base_url,
            settings.units,
            settings.request_timeout,
        )?),
        ProviderId::WeatherApi => Box::new(WeatherApiProvider::new(
            api_key.to_owned(),
            base_url,
            settings.units,
            settings.request_timeout,
        )?),
    };

    Ok(Some(boxed))
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
