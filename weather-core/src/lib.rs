//! Core library for itinerary weather forecasts.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over weather providers
//! - Normalization of raw samples into per-day, UI-ready forecasts
//! - A file-backed cache and a synthetic fallback behind `ForecastService`
//! - Packing suggestions derived from a forecast
//!
//! It is used by the `itinerary-weather` binary, but can also be reused by
//! other binaries or services.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fallback;
pub mod model;
pub mod normalize;
pub mod packing;
pub mod provider;
pub mod service;

pub use cache::{FileStore, ForecastStore, cache_key};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, DayBoundary, ProviderConfig, ServiceConfig};
pub use error::CacheError;
pub use model::{
    AdditionalInfo, CityInfo, Condition, Coordinates, CurrentConditions, DailyForecast,
    ForecastOrigin, ForecastResult, HourlySample, Location, Units, UpstreamForecast,
    UpstreamSample,
};
pub use normalize::MAX_FORECAST_DAYS;
pub use provider::{ProviderId, WeatherProvider};
pub use service::{ForecastService, ServiceStats};
