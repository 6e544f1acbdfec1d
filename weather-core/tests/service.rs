//! Behavior of `ForecastService` against a stub upstream, a temporary cache
//! directory and a manually driven clock.

use std::{
    fs,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use itinerary_weather_core::{
    CityInfo, Condition, DayBoundary, FileStore, ForecastOrigin, ForecastResult, ForecastService,
    ForecastStore, ManualClock, ProviderId, ServiceConfig, Units, UpstreamForecast,
    UpstreamSample, WeatherProvider, cache_key,
};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Debug)]
struct StubProvider {
    calls: AtomicUsize,
    response: Option<UpstreamForecast>,
}

impl StubProvider {
    fn ok(forecast: UpstreamForecast) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response: Some(forecast),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            response: None,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for StubProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn fetch_forecast(&self, _location: &str) -> anyhow::Result<UpstreamForecast> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| anyhow!("connection reset by peer"))
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
}

/// Eight 3-hourly samples per day for `days` days from `start()`.
fn upstream(days: i64) -> UpstreamForecast {
    let conditions = [Condition::Clear, Condition::Clouds, Condition::Rain];
    let samples = (0..days * 8)
        .map(|i| {
            let condition = conditions[(i / 8) as usize % conditions.len()].clone();
            UpstreamSample {
                timestamp: start() + Duration::hours(3 * i),
                temperature: 55.0 + (i % 8) as f64 * 3.0,
                humidity: 60.0,
                wind_speed: 8.0,
                icon: "01d".to_string(),
                description: condition.as_str().to_lowercase(),
                condition,
            }
        })
        .collect();

    UpstreamForecast {
        city: CityInfo {
            name: Some("Santa Barbara".to_string()),
            country: Some("US".to_string()),
            ..CityInfo::default()
        },
        samples,
    }
}

struct Harness {
    _tmp: TempDir,
    store: FileStore,
    clock: Arc<ManualClock>,
    service: ForecastService,
}

fn harness(provider: Option<Arc<StubProvider>>, tweak: impl FnOnce(&mut ServiceConfig)) -> Harness {
    let tmp = TempDir::new().unwrap();
    let mut settings = ServiceConfig {
        cache_dir: tmp.path().join("weather_cache"),
        ..ServiceConfig::default()
    };
    tweak(&mut settings);

    let clock = Arc::new(ManualClock::new(start()));
    let store = FileStore::new(settings.cache_dir.clone());
    let provider = provider.map(|p| p as Arc<dyn WeatherProvider>);

    let service = ForecastService::new(settings)
        .unwrap()
        .with_provider(provider)
        .with_clock(clock.clone());

    Harness {
        _tmp: tmp,
        store,
        clock,
        service,
    }
}

fn assert_current_mirrors_first_day(result: &ForecastResult) {
    let first = &result.forecast[0];
    assert_eq!(result.current.temperature, first.high);
    assert_eq!(result.current.condition, first.condition);
    assert_eq!(result.current.description, first.description);
}

// =============================================================================
// Upstream path
// =============================================================================

#[tokio::test]
async fn forecast_never_exceeds_requested_days() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider), |_| {});

    for days in 1..=5 {
        let result = h.service.get_forecast("Santa Barbara", days).await;
        assert!(result.forecast.len() <= days);
        assert_eq!(result.forecast.len(), days);
        assert_current_mirrors_first_day(&result);
    }
}

#[tokio::test]
async fn forecast_never_exceeds_upstream_days() {
    let h = harness(Some(StubProvider::ok(upstream(2))), |_| {});

    let result = h.service.get_forecast("Santa Barbara", 5).await;
    assert_eq!(result.forecast.len(), 2);
    assert_eq!(result.origin, ForecastOrigin::Upstream);
    assert_eq!(result.location.name, "Santa Barbara");
}

#[tokio::test]
async fn days_outside_range_are_clamped() {
    let h = harness(Some(StubProvider::ok(upstream(5))), |_| {});

    assert_eq!(h.service.get_forecast("Santa Barbara", 0).await.forecast.len(), 1);
    assert_eq!(h.service.get_forecast("Santa Barbara", 9).await.forecast.len(), 5);
}

#[tokio::test]
async fn daily_values_are_aggregated() {
    let h = harness(Some(StubProvider::ok(upstream(3))), |_| {});

    let result = h.service.get_forecast("Santa Barbara", 3).await;
    let day = &result.forecast[1];

    assert_eq!(day.low, 55);
    assert_eq!(day.high, 76);
    assert_eq!(day.condition, Condition::Clouds);
    assert_eq!(day.hourly.len(), 8);
    assert_eq!(day.humidity, 60);
    assert_eq!(day.wind_speed, 8);
    assert_eq!(result.additional_info.uv_index, "High (7-9)");
}

// =============================================================================
// Cache behavior
// =============================================================================

#[tokio::test]
async fn fresh_cache_suppresses_second_upstream_call() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    let first = h.service.get_forecast("Santa Barbara", 3).await;
    h.clock.advance(Duration::minutes(59));
    let second = h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(first, second);
    assert_eq!(h.service.stats().cache_hits, 1);
    assert_eq!(h.service.stats().upstream_calls, 1);
}

#[tokio::test]
async fn cache_entry_roundtrips_through_disk() {
    let h = harness(Some(StubProvider::ok(upstream(5))), |_| {});

    let result = h.service.get_forecast("Santa Barbara", 5).await;
    let stored = h.store.read(&cache_key("Santa Barbara")).expect("entry must be written");

    assert_eq!(stored, result);
    assert!(h.store.entry_path("santa_barbara").exists());
}

#[tokio::test]
async fn entry_older_than_an_hour_is_a_miss() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    h.service.get_forecast("Santa Barbara", 3).await;
    h.clock.advance(Duration::minutes(61));
    let refreshed = h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 2);
    assert_eq!(refreshed.last_updated, start() + Duration::minutes(61));

    let stored = h.store.read("santa_barbara").unwrap();
    assert_eq!(stored.last_updated, refreshed.last_updated);
}

#[tokio::test]
async fn entry_exactly_an_hour_old_is_a_miss() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    h.service.get_forecast("Santa Barbara", 3).await;
    h.clock.advance(Duration::hours(1));
    h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn custom_freshness_window_is_honored() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |s| s.freshness = Duration::minutes(10));

    h.service.get_forecast("Santa Barbara", 3).await;
    h.clock.advance(Duration::minutes(11));
    h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn entry_stamped_in_the_future_is_a_miss() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    let mut ahead = h.service.get_forecast("Santa Barbara", 3).await;
    ahead.last_updated = start() + Duration::hours(2);
    h.store.write("santa_barbara", &ahead).unwrap();

    let result = h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 2);
    assert_eq!(result.last_updated, start());
    assert_eq!(h.store.read("santa_barbara").unwrap().last_updated, start());
}

#[tokio::test]
async fn cached_entry_serves_shorter_requests() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    h.service.get_forecast("Santa Barbara", 2).await;
    let longer = h.service.get_forecast("Santa Barbara", 5).await;
    let shorter = h.service.get_forecast("Santa Barbara", 1).await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(longer.forecast.len(), 5);
    assert_eq!(shorter.forecast.len(), 1);
    assert_current_mirrors_first_day(&shorter);
}

#[tokio::test]
async fn location_key_is_case_and_space_insensitive() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    h.service.get_forecast("Santa Barbara", 3).await;
    h.service.get_forecast("SANTA BARBARA", 3).await;

    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn corrupted_cache_file_is_a_miss() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    fs::create_dir_all(h.store.dir()).unwrap();
    fs::write(h.store.entry_path("santa_barbara"), "{\"location\": 42").unwrap();

    let result = h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 1);
    assert_eq!(result.origin, ForecastOrigin::Upstream);
    assert_eq!(result.forecast.len(), 3);
    assert_eq!(h.store.read("santa_barbara").unwrap().forecast.len(), 5);
}

#[tokio::test]
async fn entry_in_other_units_is_refetched() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |s| s.units = Units::Metric);

    let mut imperial = h.service.get_forecast("Santa Barbara", 3).await;
    imperial.units = Units::Imperial;
    h.store.write("santa_barbara", &imperial).unwrap();

    let result = h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 2);
    assert_eq!(result.units, Units::Metric);
}

#[tokio::test]
async fn unwritable_cache_still_returns_result() {
    let provider = StubProvider::ok(upstream(5));
    let h = harness(Some(provider.clone()), |_| {});

    // A plain file where the cache directory should be.
    fs::write(h.store.dir(), "not a directory").unwrap();

    let result = h.service.get_forecast("Santa Barbara", 3).await;
    assert_eq!(result.origin, ForecastOrigin::Upstream);
    assert_eq!(result.forecast.len(), 3);
}

// =============================================================================
// Fallback path
// =============================================================================

#[tokio::test]
async fn missing_credential_skips_network_and_cache() {
    let h = harness(None, |_| {});
    assert!(h.service.is_fallback_only());

    let result = h.service.get_forecast("Santa Barbara", 3).await;

    assert!(result.is_fallback());
    assert_eq!(result.forecast.len(), 3);
    assert_eq!(result.location.name, "Santa Barbara");
    assert!(!h.store.dir().exists());
    assert_eq!(h.service.stats().fallbacks, 1);
    assert_eq!(h.service.stats().upstream_calls, 0);
}

#[tokio::test]
async fn upstream_failure_falls_back() {
    let provider = StubProvider::failing();
    let h = harness(Some(provider.clone()), |_| {});

    let result = h.service.get_forecast("Santa Barbara", 4).await;

    assert_eq!(provider.calls(), 1);
    assert!(result.is_fallback());
    assert_eq!(result.forecast.len(), 4);
    assert_current_mirrors_first_day(&result);
    assert!(h.store.read("santa_barbara").is_none());
    assert_eq!(h.service.stats().fallbacks, 1);
}

#[tokio::test]
async fn failed_upstream_is_retried_on_next_call() {
    let provider = StubProvider::failing();
    let h = harness(Some(provider.clone()), |_| {});

    h.service.get_forecast("Santa Barbara", 3).await;
    h.service.get_forecast("Santa Barbara", 3).await;

    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn malformed_upstream_sample_falls_back() {
    let mut forecast = upstream(2);
    forecast.samples[3].humidity = f64::INFINITY;
    let h = harness(Some(StubProvider::ok(forecast)), |_| {});

    let result = h.service.get_forecast("Santa Barbara", 2).await;
    assert!(result.is_fallback());
}

#[tokio::test]
async fn fallback_is_deterministic_within_a_day() {
    let h = harness(None, |_| {});

    let first = h.service.get_forecast("Santa Barbara", 5).await;
    h.clock.advance(Duration::hours(5));
    let mut second = h.service.get_forecast("Santa Barbara", 5).await;

    assert_ne!(first.last_updated, second.last_updated);
    second.last_updated = first.last_updated;
    assert_eq!(first, second);
}

// =============================================================================
// Day boundary
// =============================================================================

fn evening_samples() -> UpstreamForecast {
    // 22:00 and 02:00 UTC: one day at UTC-5, two days at UTC.
    let samples = [22, 26]
        .into_iter()
        .map(|h| UpstreamSample {
            timestamp: start() + Duration::hours(h),
            temperature: 70.0,
            humidity: 50.0,
            wind_speed: 3.0,
            condition: Condition::Clear,
            icon: "01n".to_string(),
            description: "clear sky".to_string(),
        })
        .collect();

    UpstreamForecast {
        city: CityInfo {
            utc_offset_secs: Some(-5 * 3600),
            ..CityInfo::default()
        },
        samples,
    }
}

#[tokio::test]
async fn local_boundary_uses_clock_offset() {
    let h = harness(Some(StubProvider::ok(evening_samples())), |_| {});

    let result = h.service.get_forecast("Chicago", 5).await;
    assert_eq!(result.forecast.len(), 2);
}

#[tokio::test]
async fn city_boundary_uses_upstream_offset() {
    let h = harness(Some(StubProvider::ok(evening_samples())), |s| {
        s.day_boundary = DayBoundary::City;
    });

    let result = h.service.get_forecast("Chicago", 5).await;
    assert_eq!(result.forecast.len(), 1);
    assert_eq!(result.forecast[0].hourly[0].time, "5 PM");
}

#[tokio::test]
async fn fallback_dates_follow_clock_offset() {
    let tmp = TempDir::new().unwrap();
    let settings = ServiceConfig {
        cache_dir: tmp.path().to_path_buf(),
        ..ServiceConfig::default()
    };
    let clock = Arc::new(ManualClock::with_offset(
        start() - Duration::hours(1),
        FixedOffset::east_opt(2 * 3600).unwrap(),
    ));
    let service = ForecastService::new(settings).unwrap().with_provider(None).with_clock(clock);

    let result = service.get_forecast("Athens", 1).await;
    assert_eq!(result.forecast[0].date, start().date_naive());
}
