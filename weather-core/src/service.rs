//! Read-through forecast service with a synthetic fallback.
//!
//! [`ForecastService::get_forecast`] always produces a well-formed result:
//! a missing credential, an upstream failure or an unusable cache entry only
//! change where the data comes from. Use [`ForecastResult::origin`] and
//! [`ForecastService::stats`] to see which path served a request.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use anyhow::Result;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    cache::{FileStore, ForecastStore, cache_key},
    clock::{Clock, SystemClock},
    config::{DayBoundary, ServiceConfig},
    fallback,
    model::{ForecastResult, UpstreamForecast},
    normalize::{MAX_FORECAST_DAYS, normalize},
    provider::{WeatherProvider, provider_from_config},
};

#[derive(Debug, Default)]
struct Counters {
    upstream_calls: AtomicU64,
    cache_hits: AtomicU64,
    fallbacks: AtomicU64,
}

/// How requests were served since the service was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServiceStats {
    pub upstream_calls: u64,
    pub cache_hits: u64,
    pub fallbacks: u64,
}

#[derive(Debug)]
pub struct ForecastService {
    settings: ServiceConfig,
    provider: Option<Arc<dyn WeatherProvider>>,
    store: Arc<dyn ForecastStore>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl ForecastService {
    /// Build the service from resolved settings. Without an API key the
    /// service runs in fallback-only mode.
    pub fn new(settings: ServiceConfig) -> Result<Self> {
        let provider: Option<Arc<dyn WeatherProvider>> =
            provider_from_config(&settings)?.map(Arc::from);

        if provider.is_none() {
            info!(
                provider = %settings.provider,
                env_var = settings.provider.api_key_env_var(),
                "No API key found, serving synthetic forecasts"
            );
        }

        let store = Arc::new(FileStore::new(settings.cache_dir.clone()));

        Ok(Self {
            settings,
            provider,
            store,
            clock: Arc::new(SystemClock),
            counters: Counters::default(),
        })
    }

    /// Replace the upstream source; `None` switches to fallback-only mode.
    pub fn with_provider(mut self, provider: Option<Arc<dyn WeatherProvider>>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ForecastStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &ServiceConfig {
        &self.settings
    }

    pub fn is_fallback_only(&self) -> bool {
        self.provider.is_none()
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            upstream_calls: self.counters.upstream_calls.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
        }
    }

    /// Forecast for `location` covering at most `days` days (clamped to 1..=5).
    #[instrument(skip(self))]
    pub async fn get_forecast(&self, location: &str, days: usize) -> ForecastResult {
        let days = days.clamp(1, MAX_FORECAST_DAYS);
        let now = self.clock.now();

        let Some(provider) = self.provider.as_deref() else {
            return self.fallback(location, days, now);
        };

        let key = cache_key(location);

        if let Some(cached) = self.store.read(&key) {
            if self.is_fresh(&cached, now) {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                info!(%key, "Using cached weather data");
                return cached.truncated(days);
            }
            debug!(%key, last_updated = %cached.last_updated, "Cached forecast is stale");
        }

        match self.fetch_live(provider, location, now).await {
            Ok(result) => {
                if let Err(err) = self.store.write(&key, &result) {
                    warn!(%key, %err, "Failed to cache forecast");
                }
                result.truncated(days)
            }
            Err(err) => {
                warn!(
                    provider = %provider.id(),
                    error = %format!("{err:#}"),
                    "Error fetching weather data, using fallback"
                );
                self.fallback(location, days, now)
            }
        }
    }

    /// Entries are valid for the freshness window from `last_updated`, and
    /// only in the unit system currently configured. Entries stamped in the
    /// future are never fresh.
    fn is_fresh(&self, cached: &ForecastResult, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(cached.last_updated);
        cached.units == self.settings.units
            && age >= Duration::zero()
            && age < self.settings.freshness
    }

    /// One upstream call, normalized to the full cacheable span.
    async fn fetch_live(
        &self,
        provider: &dyn WeatherProvider,
        location: &str,
        now: DateTime<Utc>,
    ) -> Result<ForecastResult> {
        self.counters.upstream_calls.fetch_add(1, Ordering::Relaxed);

        let raw = provider.fetch_forecast(location).await?;
        debug!(samples = raw.samples.len(), "Normalizing upstream forecast");

        let offset = self.day_offset(&raw);
        normalize(raw, location, MAX_FORECAST_DAYS, offset, self.settings.units, now)
    }

    fn day_offset(&self, raw: &UpstreamForecast) -> FixedOffset {
        let local = self.clock.local_offset();
        match self.settings.day_boundary {
            DayBoundary::Local => local,
            DayBoundary::City => raw
                .city
                .utc_offset_secs
                .and_then(FixedOffset::east_opt)
                .unwrap_or(local),
        }
    }

    fn fallback(&self, location: &str, days: usize, now: DateTime<Utc>) -> ForecastResult {
        self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
        fallback::generate(
            location,
            days,
            now,
            self.clock.local_offset(),
            self.settings.units,
        )
    }
}
