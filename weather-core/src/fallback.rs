//! Synthetic forecast served when live data is unavailable.
//!
//! Output depends only on the requested name, `days`, the calendar day of
//! `now` in `offset`, and the unit system. `last_updated` is the one field
//! that differs between two calls on the same day.

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::{
    model::{
        AdditionalInfo, Condition, CurrentConditions, DailyForecast, ForecastOrigin,
        ForecastResult, HourlySample, Location, Units,
    },
    normalize::{AIR_QUALITY_PLACEHOLDER, DEFAULT_SUNRISE, DEFAULT_SUNSET, DEFAULT_UV_INDEX},
};

struct Pattern {
    condition: Condition,
    icon: &'static str,
    high_f: i32,
    low_f: i32,
}

fn patterns() -> [Pattern; 4] {
    [
        Pattern {
            condition: Condition::Clear,
            icon: "01d",
            high_f: 75,
            low_f: 60,
        },
        Pattern {
            condition: Condition::PartlyCloudy,
            icon: "02d",
            high_f: 72,
            low_f: 58,
        },
        Pattern {
            condition: Condition::Cloudy,
            icon: "03d",
            high_f: 68,
            low_f: 55,
        },
        Pattern {
            condition: Condition::LightRain,
            icon: "10d",
            high_f: 65,
            low_f: 52,
        },
    ]
}

const HOURS: [i32; 4] = [9, 12, 15, 18];
const HUMIDITY: u8 = 65;
const WIND_SPEED: u32 = 10;

pub fn generate(
    location: &str,
    days: usize,
    now: DateTime<Utc>,
    offset: FixedOffset,
    units: Units,
) -> ForecastResult {
    let today = now.with_timezone(&offset).date_naive();
    let patterns = patterns();
    let convert = |f: i32| units.convert_fahrenheit(f64::from(f)).round() as i32;

    let forecast: Vec<DailyForecast> = (0..days)
        .map(|i| {
            let date = today + Duration::days(i as i64);
            let pattern = &patterns[i % patterns.len()];
            let description = pattern.condition.as_str().to_lowercase();

            let hourly = HOURS
                .iter()
                .map(|&hour| HourlySample {
                    time: hour_label(hour),
                    temp: convert(pattern.high_f - 5 + (hour - 12) * 2),
                    condition: pattern.condition.clone(),
                    icon: pattern.icon.to_string(),
                    description: description.clone(),
                })
                .collect();

            DailyForecast {
                date,
                date_label: date.format("%a, %b %d").to_string(),
                day_name: date.format("%A").to_string(),
                high: convert(pattern.high_f),
                low: convert(pattern.low_f),
                condition: pattern.condition.clone(),
                icon: pattern.icon.to_string(),
                description,
                humidity: HUMIDITY,
                wind_speed: WIND_SPEED,
                hourly,
            }
        })
        .collect();

    ForecastResult {
        location: Location {
            name: location.to_string(),
            country: None,
            coordinates: None,
        },
        current: CurrentConditions::from_days(&forecast),
        forecast,
        additional_info: AdditionalInfo {
            uv_index: DEFAULT_UV_INDEX.to_string(),
            air_quality: AIR_QUALITY_PLACEHOLDER.to_string(),
            sunrise: DEFAULT_SUNRISE.to_string(),
            sunset: DEFAULT_SUNSET.to_string(),
        },
        last_updated: now,
        units,
        origin: ForecastOrigin::Fallback,
    }
}

fn hour_label(hour: i32) -> String {
    let display = if hour % 12 == 0 { 12 } else { hour % 12 };
    let meridiem = if hour >= 12 { "PM" } else { "AM" };
    format!("{display} {meridiem}")
}
