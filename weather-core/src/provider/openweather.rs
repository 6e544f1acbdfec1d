use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    model::{CityInfo, Condition, Coordinates, Units, UpstreamForecast, UpstreamSample},
    provider::{ProviderId, truncate_body},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// OpenWeatherMap 5-day / 3-hour forecast.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    units: Units,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, units: Units, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            units,
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: Option<String>,
    country: Option<String>,
    coord: Option<OwCoord>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    /// Shift in seconds from UTC.
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: Option<OwCity>,
    list: Vec<OwForecastEntry>,
}

/// Unix timestamp rendered as wall-clock time in the city's offset.
fn city_time(ts: Option<i64>, offset: Option<FixedOffset>) -> Option<NaiveTime> {
    let at = DateTime::from_timestamp(ts?, 0)?;
    Some(match offset {
        Some(offset) => at.with_timezone(&offset).time(),
        None => at.time(),
    })
}

fn convert_response(parsed: OwForecastResponse) -> Result<UpstreamForecast> {
    let city = match parsed.city {
        Some(city) => {
            let offset = city.timezone.and_then(FixedOffset::east_opt);
            CityInfo {
                name: city.name,
                country: city.country.filter(|c| !c.is_empty()),
                coordinates: city.coord.map(|c| Coordinates {
                    lat: c.lat,
                    lon: c.lon,
                }),
                sunrise: city_time(city.sunrise, offset),
                sunset: city_time(city.sunset, offset),
                utc_offset_secs: city.timezone,
            }
        }
        None => CityInfo::default(),
    };

    let samples = parsed
        .list
        .into_iter()
        .map(|entry| {
            let timestamp = DateTime::from_timestamp(entry.dt, 0)
                .ok_or_else(|| anyhow!("OpenWeather sample has invalid timestamp {}", entry.dt))?;
            let weather = entry
                .weather
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("OpenWeather sample at {timestamp} has no weather block"))?;

            Ok(UpstreamSample {
                timestamp,
                temperature: entry.main.temp,
                humidity: entry.main.humidity,
                wind_speed: entry.wind.speed,
                condition: Condition::from_label(&weather.main),
                icon: weather.icon,
                description: weather.description,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(UpstreamForecast { city, samples })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn fetch_forecast(&self, location: &str) -> Result<UpstreamForecast> {
        let url = format!("{}/forecast", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to OpenWeather (5-day forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read OpenWeather forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OwForecastResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather forecast JSON")?;

        debug!(samples = parsed.list.len(), "Received OpenWeather forecast");
        convert_response(parsed)
    }
}
