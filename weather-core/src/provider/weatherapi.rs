use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    model::{CityInfo, Condition, Coordinates, Units, UpstreamForecast, UpstreamSample},
    normalize::MAX_FORECAST_DAYS,
    provider::{ProviderId, truncate_body},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// WeatherAPI.com forecast, flattened from its per-day hourly blocks.
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    units: Units,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String, base_url: String, units: Units, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for WeatherAPI")?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            units,
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    localtime_epoch: Option<i64>,
    /// `"2024-07-01 10:15"` in the location's own timezone.
    localtime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: String,
    code: u32,
}

#[derive(Debug, Deserialize)]
struct WaForecastHour {
    time_epoch: i64,
    temp_c: f64,
    temp_f: f64,
    humidity: f64,
    wind_kph: f64,
    wind_mph: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaAstro {
    sunrise: Option<String>,
    sunset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    astro: Option<WaAstro>,
    hour: Vec<WaForecastHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    forecast: WaForecast,
}

/// Map a WeatherAPI.com condition code to a category.
/// See <https://www.weatherapi.com/docs/weather_conditions.json>.
fn condition_from_code(code: u32, text: &str) -> Condition {
    match code {
        1000 => Condition::Clear,
        1003 | 1006 | 1009 => Condition::Clouds,
        1030 => Condition::Mist,
        1135 | 1147 => Condition::Fog,
        1150 | 1153 | 1168 | 1171 | 1072 => Condition::Drizzle,
        1063 | 1180..=1201 | 1240..=1246 => Condition::Rain,
        1066 | 1069 | 1114 | 1117 | 1204..=1237 | 1249..=1264 => Condition::Snow,
        1087 | 1273..=1282 => Condition::Thunderstorm,
        _ => Condition::Other(text.trim().to_string()),
    }
}

/// Offset of the location's wall clock from UTC, from its reported local time.
fn utc_offset_secs(location: &WaLocation) -> Option<i32> {
    let local =
        NaiveDateTime::parse_from_str(location.localtime.as_deref()?, "%Y-%m-%d %H:%M").ok()?;
    let utc = DateTime::from_timestamp(location.localtime_epoch?, 0)?.naive_utc();
    let secs = (local - utc).num_seconds();
    // localtime has minute precision; round to the nearest quarter hour
    let rounded = ((secs as f64 / 900.0).round() * 900.0) as i64;
    i32::try_from(rounded).ok()
}

fn parse_astro_time(value: Option<&str>) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value?.trim(), "%I:%M %p").ok()
}

impl WeatherApiProvider {
    fn convert_response(&self, parsed: WaForecastResponse) -> Result<UpstreamForecast> {
        let location = &parsed.location;
        let astro = parsed.forecast.forecastday.first().and_then(|d| d.astro.as_ref());

        let city = CityInfo {
            name: Some(location.name.clone()),
            country: location.country.clone().filter(|c| !c.is_empty()),
            coordinates: location
                .lat
                .zip(location.lon)
                .map(|(lat, lon)| Coordinates { lat, lon }),
            sunrise: parse_astro_time(astro.and_then(|a| a.sunrise.as_deref())),
            sunset: parse_astro_time(astro.and_then(|a| a.sunset.as_deref())),
            utc_offset_secs: utc_offset_secs(location),
        };

        let mut samples = Vec::new();
        for day in parsed.forecast.forecastday {
            for hour in day.hour {
                let timestamp = DateTime::from_timestamp(hour.time_epoch, 0).with_context(|| {
                    format!("WeatherAPI hour has invalid timestamp {}", hour.time_epoch)
                })?;

                let (temperature, wind_speed) = match self.units {
                    Units::Imperial => (hour.temp_f, hour.wind_mph),
                    Units::Metric => (hour.temp_c, hour.wind_kph / 3.6),
                };

                samples.push(UpstreamSample {
                    timestamp,
                    temperature,
                    humidity: hour.humidity,
                    wind_speed,
                    condition: condition_from_code(hour.condition.code, &hour.condition.text),
                    icon: hour.condition.icon,
                    description: hour.condition.text.trim().to_lowercase(),
                });
            }
        }

        Ok(UpstreamForecast { city, samples })
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    async fn fetch_forecast(&self, location: &str) -> Result<UpstreamForecast> {
        let url = format!("{}/forecast.json", self.base_url);
        let days = MAX_FORECAST_DAYS.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", location),
                ("days", days.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to WeatherAPI.com (forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read WeatherAPI forecast response body")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "WeatherAPI forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: WaForecastResponse =
            serde_json::from_str(&body).context("Failed to parse WeatherAPI forecast JSON")?;

        debug!(days = parsed.forecast.forecastday.len(), "Received WeatherAPI forecast");
        self.convert_response(parsed)
    }
}
