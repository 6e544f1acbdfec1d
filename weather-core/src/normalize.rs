//! Turns a provider's flat sample list into a [`ForecastResult`].

use anyhow::{Result, ensure};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

use crate::model::{
    AdditionalInfo, Condition, CurrentConditions, DailyForecast, ForecastOrigin,
    ForecastResult, HourlySample, Location, Units, UpstreamForecast, UpstreamSample,
};

/// Upper bound on forecast days; the free upstream tiers stop at five.
pub const MAX_FORECAST_DAYS: usize = 5;
pub const MAX_HOURLY_SAMPLES: usize = 8;

pub const DEFAULT_SUNRISE: &str = "6:30 AM";
pub const DEFAULT_SUNSET: &str = "7:00 PM";
pub const DEFAULT_UV_INDEX: &str = "Moderate (5-7)";
pub const AIR_QUALITY_PLACEHOLDER: &str = "Good";

/// UV estimate derived only from the day's primary condition.
pub fn estimate_uv_index(condition: &Condition) -> &'static str {
    match condition {
        Condition::Clear => "High (7-9)",
        Condition::Clouds => "Moderate (3-5)",
        Condition::Rain | Condition::Snow | Condition::Thunderstorm => "Low (1-2)",
        _ => DEFAULT_UV_INDEX,
    }
}

struct DayBucket<'a> {
    date: NaiveDate,
    samples: Vec<&'a UpstreamSample>,
}

/// Group samples by calendar day in `offset`, keeping at most `days` buckets
/// in the order their first sample appears.
fn bucket_by_day(
    samples: &[UpstreamSample],
    days: usize,
    offset: FixedOffset,
) -> Vec<DayBucket<'_>> {
    let mut buckets: Vec<DayBucket<'_>> = Vec::new();

    for sample in samples {
        let date = sample.timestamp.with_timezone(&offset).date_naive();

        if let Some(i) = buckets.iter().position(|b| b.date == date) {
            buckets[i].samples.push(sample);
        } else if buckets.len() < days {
            buckets.push(DayBucket {
                date,
                samples: vec![sample],
            });
        }
    }

    buckets
}

/// Most frequent condition; ties go to the one seen first.
fn primary_condition(samples: &[&UpstreamSample]) -> Condition {
    let mut counts: Vec<(&Condition, usize)> = Vec::new();
    for sample in samples {
        match counts.iter_mut().find(|(c, _)| *c == &sample.condition) {
            Some((_, n)) => *n += 1,
            None => counts.push((&sample.condition, 1)),
        }
    }

    let mut best: Option<(&Condition, usize)> = None;
    for (condition, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((condition, count));
        }
    }

    best.map(|(c, _)| c.clone()).unwrap_or(Condition::Clear)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

fn summarize_day(bucket: &DayBucket<'_>, offset: FixedOffset) -> DailyForecast {
    let samples = &bucket.samples;
    let temps = samples.iter().map(|s| s.temperature);
    let high = temps.clone().fold(f64::NEG_INFINITY, f64::max);
    let low = temps.fold(f64::INFINITY, f64::min);

    let first = samples[0];

    let hourly = samples
        .iter()
        .take(MAX_HOURLY_SAMPLES)
        .map(|s| HourlySample {
            time: s.timestamp.with_timezone(&offset).format("%-I %p").to_string(),
            temp: s.temperature.round() as i32,
            condition: s.condition.clone(),
            icon: s.icon.clone(),
            description: s.description.clone(),
        })
        .collect();

    DailyForecast {
        date: bucket.date,
        date_label: bucket.date.format("%a, %b %d").to_string(),
        day_name: bucket.date.format("%A").to_string(),
        high: high.round() as i32,
        low: low.round() as i32,
        condition: primary_condition(samples),
        icon: first.icon.clone(),
        description: first.description.clone(),
        humidity: mean(samples.iter().map(|s| s.humidity)).round().clamp(0.0, 100.0) as u8,
        wind_speed: mean(samples.iter().map(|s| s.wind_speed)).round().max(0.0) as u32,
        hourly,
    }
}

fn format_sun_time(time: Option<NaiveTime>, default: &str) -> String {
    time.map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_else(|| default.to_string())
}

/// Build the UI-ready result for `requested` from raw provider data.
///
/// Fails when a sample carries non-finite readings; callers treat that like
/// any other upstream failure.
pub fn normalize(
    raw: UpstreamForecast,
    requested: &str,
    days: usize,
    offset: FixedOffset,
    units: Units,
    now: DateTime<Utc>,
) -> Result<ForecastResult> {
    for sample in &raw.samples {
        ensure!(
            sample.temperature.is_finite()
                && sample.humidity.is_finite()
                && sample.wind_speed.is_finite(),
            "Upstream sample at {} has non-finite readings",
            sample.timestamp
        );
    }

    let forecast: Vec<DailyForecast> = bucket_by_day(&raw.samples, days, offset)
        .iter()
        .map(|bucket| summarize_day(bucket, offset))
        .collect();

    let uv_index = estimate_uv_index(
        forecast.first().map(|d| &d.condition).unwrap_or(&Condition::Clear),
    );

    let city = raw.city;

    Ok(ForecastResult {
        location: Location {
            name: city.name.unwrap_or_else(|| requested.to_string()),
            country: city.country,
            coordinates: city.coordinates,
        },
        current: CurrentConditions::from_days(&forecast),
        forecast,
        additional_info: AdditionalInfo {
            uv_index: uv_index.to_string(),
            air_quality: AIR_QUALITY_PLACEHOLDER.to_string(),
            sunrise: format_sun_time(city.sunrise, DEFAULT_SUNRISE),
            sunset: format_sun_time(city.sunset, DEFAULT_SUNSET),
        },
        last_updated: now,
        units,
        origin: ForecastOrigin::Upstream,
    })
}
