//! Plain-text output for the terminal.

use itinerary_weather_core::ForecastResult;

pub const FALLBACK_NOTICE: &str =
    "Note: live weather is unavailable, showing a synthetic forecast.";

/// Emoji for an OpenWeatherMap icon code; anything else gets a generic glyph.
pub fn icon_glyph(icon: &str) -> &'static str {
    match icon {
        "01d" => "☀️",
        "01n" => "🌙",
        "02d" => "⛅",
        "02n" | "03d" | "03n" | "04d" | "04n" => "☁️",
        "09d" | "09n" | "10n" => "🌧️",
        "10d" => "🌦️",
        "11d" | "11n" => "⛈️",
        "13d" | "13n" => "❄️",
        "50d" | "50n" => "🌫️",
        _ => "🌤️",
    }
}

pub fn forecast(result: &ForecastResult) -> String {
    let unit = result.units.temperature_symbol();
    let mut out = String::new();

    let place = match &result.location.country {
        Some(country) => format!("{}, {country}", result.location.name),
        None => result.location.name.clone(),
    };
    out.push_str(&format!("Weather for {place}:\n"));
    out.push_str(&format!(
        "Current: {}{unit}, {} ({})\n",
        result.current.temperature, result.current.condition, result.current.description
    ));
    if result.is_fallback() {
        out.push_str(FALLBACK_NOTICE);
        out.push('\n');
    }

    out.push_str(&format!("\n{}-Day Forecast:\n", result.forecast.len()));
    for day in &result.forecast {
        out.push_str(&format!(
            "{} {}: {}°/{}{unit}, {} (humidity {}%, wind {})\n",
            icon_glyph(&day.icon),
            day.date_label,
            day.high,
            day.low,
            day.condition,
            day.humidity,
            day.wind_speed,
        ));

        let hourly: Vec<String> = day
            .hourly
            .iter()
            .map(|h| format!("{} {}°", h.time, h.temp))
            .collect();
        if !hourly.is_empty() {
            out.push_str(&format!("    {}\n", hourly.join(" | ")));
        }
    }

    let info = &result.additional_info;
    out.push_str(&format!(
        "\nUV index: {} | Air quality: {} | Sunrise: {} | Sunset: {}\n",
        info.uv_index, info.air_quality, info.sunrise, info.sunset
    ));

    out
}

pub fn suggestions(items: &[String]) -> String {
    let mut out = String::from("\nPacking Suggestions:\n");
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out
}
