use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weather category shared by upstream samples, daily summaries and fallback data.
///
/// Serialized as its display label so cached payloads stay readable by the
/// itinerary front end (`"Partly Cloudy"`, `"Rain"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Clear,
    Sunny,
    Clouds,
    PartlyCloudy,
    Cloudy,
    Drizzle,
    LightRain,
    Rain,
    Snow,
    Thunderstorm,
    Mist,
    Fog,
    Other(String),
}

impl Condition {
    pub fn as_str(&self) -> &str {
        match self {
            Condition::Clear => "Clear",
            Condition::Sunny => "Sunny",
            Condition::Clouds => "Clouds",
            Condition::PartlyCloudy => "Partly Cloudy",
            Condition::Cloudy => "Cloudy",
            Condition::Drizzle => "Drizzle",
            Condition::LightRain => "Light Rain",
            Condition::Rain => "Rain",
            Condition::Snow => "Snow",
            Condition::Thunderstorm => "Thunderstorm",
            Condition::Mist => "Mist",
            Condition::Fog => "Fog",
            Condition::Other(label) => label.as_str(),
        }
    }

    /// Parse an upstream category label. Unknown labels are kept verbatim.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "clear" => Condition::Clear,
            "sunny" => Condition::Sunny,
            "clouds" => Condition::Clouds,
            "partly cloudy" => Condition::PartlyCloudy,
            "cloudy" => Condition::Cloudy,
            "drizzle" => Condition::Drizzle,
            "light rain" => Condition::LightRain,
            "rain" => Condition::Rain,
            "snow" => Condition::Snow,
            "thunderstorm" => Condition::Thunderstorm,
            "mist" => Condition::Mist,
            "fog" => Condition::Fog,
            _ => Condition::Other(label.trim().to_string()),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        Condition::from_label(&value)
    }
}

impl From<Condition> for String {
    fn from(value: Condition) -> Self {
        value.as_str().to_string()
    }
}

/// Unit system requested from the upstream and used for every temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Imperial,
    Metric,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Units::Imperial => "°F",
            Units::Metric => "°C",
        }
    }

    pub fn to_fahrenheit(self, value: f64) -> f64 {
        match self {
            Units::Imperial => value,
            Units::Metric => value * 9.0 / 5.0 + 32.0,
        }
    }

    /// Express a °F reading in this unit system.
    pub fn convert_fahrenheit(self, value: f64) -> f64 {
        match self {
            Units::Imperial => value,
            Units::Metric => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySample {
    pub time: String,
    pub temp: i32,
    pub condition: Condition,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// Display label, e.g. `"Mon, Oct 19"`.
    pub date_label: String,
    pub day_name: String,
    pub high: i32,
    pub low: i32,
    pub condition: Condition,
    pub icon: String,
    pub description: String,
    pub humidity: u8,
    pub wind_speed: u32,
    pub hourly: Vec<HourlySample>,
}

/// Snapshot shown at the top of the widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: i32,
    pub condition: Condition,
    pub description: String,
}

impl CurrentConditions {
    pub const DEFAULT_TEMPERATURE: i32 = 70;

    /// Mirrors the first forecast day, or the fixed defaults when there is none.
    pub fn from_days(days: &[DailyForecast]) -> Self {
        match days.first() {
            Some(day) => Self {
                temperature: day.high,
                condition: day.condition.clone(),
                description: day.description.clone(),
            },
            None => Self {
                temperature: Self::DEFAULT_TEMPERATURE,
                condition: Condition::Clear,
                description: "clear sky".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalInfo {
    pub uv_index: String,
    pub air_quality: String,
    pub sunrise: String,
    pub sunset: String,
}

/// Where a result's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastOrigin {
    Upstream,
    Fallback,
}

/// Normalized, UI-ready forecast. This is also the on-disk cache payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub location: Location,
    pub current: CurrentConditions,
    pub forecast: Vec<DailyForecast>,
    pub additional_info: AdditionalInfo,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub units: Units,
    pub origin: ForecastOrigin,
}

impl ForecastResult {
    pub fn is_fallback(&self) -> bool {
        self.origin == ForecastOrigin::Fallback
    }

    /// Keep at most `days` entries. `current` is unaffected since day 0 survives.
    pub fn truncated(mut self, days: usize) -> Self {
        self.forecast.truncate(days.max(1));
        self
    }
}

/// City metadata returned next to the raw samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityInfo {
    pub name: Option<String>,
    pub country: Option<String>,
    pub coordinates: Option<Coordinates>,
    /// Local wall-clock sunrise in the city.
    pub sunrise: Option<NaiveTime>,
    pub sunset: Option<NaiveTime>,
    /// Offset from UTC in seconds, when the provider reports it.
    pub utc_offset_secs: Option<i32>,
}

/// One timestamped sample from the provider's flat list.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub condition: Condition,
    pub icon: String,
    pub description: String,
}

/// Raw provider payload, already decoded from the provider's wire format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamForecast {
    pub city: CityInfo,
    pub samples: Vec<UpstreamSample>,
}
