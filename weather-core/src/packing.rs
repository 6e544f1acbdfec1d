//! Packing suggestions derived from a normalized forecast.

use std::collections::HashSet;

use crate::model::{Condition, ForecastResult};

const BASELINE: [&str; 2] = ["Comfortable walking shoes", "Sunglasses"];

/// Thresholds in °F.
const COOL_EVENING_F: f64 = 60.0;
const HOT_DAY_F: f64 = 80.0;

/// Suggestions in a fixed order: the baseline items, then layering, sun
/// protection, rain gear and beach attire, each only when its rule fires.
pub fn suggest(forecast: &ForecastResult) -> Vec<String> {
    let units = forecast.units;
    let mut suggestions: Vec<String> = BASELINE.iter().map(|s| s.to_string()).collect();

    let mut conditions: HashSet<&Condition> = HashSet::new();
    let mut min_low: Option<i32> = None;
    let mut max_high: Option<i32> = None;

    for day in &forecast.forecast {
        conditions.insert(&day.condition);
        min_low = Some(min_low.map_or(day.low, |m| m.min(day.low)));
        max_high = Some(max_high.map_or(day.high, |m| m.max(day.high)));
    }

    if min_low.is_some_and(|low| units.to_fahrenheit(f64::from(low)) < COOL_EVENING_F) {
        suggestions.push("Light jacket or sweater for evenings".to_string());
    }

    if max_high.is_some_and(|high| units.to_fahrenheit(f64::from(high)) > HOT_DAY_F) {
        suggestions.push("Sunscreen (SPF 30+)".to_string());
        suggestions.push("Hat for sun protection".to_string());
    }

    if conditions.contains(&Condition::Rain) || conditions.contains(&Condition::Drizzle) {
        suggestions.push("Umbrella or rain jacket".to_string());
        suggestions.push("Waterproof shoes".to_string());
    }

    if conditions.contains(&Condition::Clear) || conditions.contains(&Condition::Sunny) {
        suggestions.push("Beach attire if visiting coast".to_string());
    }

    suggestions
}
