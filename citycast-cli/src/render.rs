use chrono::{DateTime, FixedOffset, Utc};
use citycast_core::{
    CityWeather, DailySummary, FavoriteEntry, FavoriteWeather, ForecastEntry, UserPreferences,
};
use std::fmt::Write as _;

const MPS_TO_MPH: f64 = 2.236_936;

pub fn temperature(celsius: f64, metric: bool) -> String {
    if metric {
        format!("{celsius:.1}°C")
    } else {
        format!("{:.1}°F", celsius * 9.0 / 5.0 + 32.0)
    }
}

pub fn wind(mps: f64, metric: bool) -> String {
    if metric {
        format!("{mps:.1} m/s")
    } else {
        format!("{:.1} mph", mps * MPS_TO_MPH)
    }
}

/// Compass point for a wind direction in degrees.
pub fn compass(deg: u16) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let idx = ((f64::from(deg % 360) + 22.5) / 45.0) as usize % 8;
    POINTS[idx]
}

fn local_time(at: DateTime<Utc>, offset_secs: i32, fmt: &str) -> String {
    match FixedOffset::east_opt(offset_secs) {
        Some(offset) => at.with_timezone(&offset).format(fmt).to_string(),
        None => at.format(fmt).to_string(),
    }
}

pub fn current(weather: &CityWeather, metric: bool) -> String {
    let c = &weather.current;
    let offset = weather.forecast.timezone_offset_secs;
    let mut out = String::new();

    let _ = writeln!(out, "{}, {}: {}", c.city, c.country, c.description);
    let _ = writeln!(
        out,
        "  temperature {} (feels like {}), min {} / max {}",
        temperature(c.temperature_c, metric),
        temperature(c.feels_like_c, metric),
        temperature(c.temp_min_c, metric),
        temperature(c.temp_max_c, metric),
    );
    let _ = writeln!(
        out,
        "  humidity {}%, pressure {} hPa, clouds {}%, visibility {:.1} km",
        c.humidity_pct,
        c.pressure_hpa,
        c.cloudiness_pct,
        f64::from(c.visibility_m) / 1000.0,
    );
    let _ = writeln!(out, "  wind {} {}", wind(c.wind_speed_mps, metric), compass(c.wind_deg));
    let _ = writeln!(
        out,
        "  sunrise {}, sunset {}",
        local_time(c.sunrise, offset, "%H:%M"),
        local_time(c.sunset, offset, "%H:%M"),
    );
    out
}

pub fn hourly(entries: &[ForecastEntry], offset_secs: i32, metric: bool) -> String {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(
            out,
            "  {}  {:>8}  {:>3.0}% rain  {}",
            local_time(e.at, offset_secs, "%a %H:%M"),
            temperature(e.temperature_c, metric),
            e.precipitation_probability * 100.0,
            e.description,
        );
    }
    out
}

pub fn daily(days: &[DailySummary], metric: bool) -> String {
    let mut out = String::new();
    for d in days {
        let _ = writeln!(
            out,
            "  {}  {:>8} / {:<8}  {:>3.0}% rain  {}",
            d.date.format("%a %d.%m"),
            temperature(d.min_c, metric),
            temperature(d.max_c, metric),
            d.precipitation_probability * 100.0,
            d.description,
        );
    }
    out
}

pub fn history(history: &[String], current_city: &str) -> String {
    if history.is_empty() {
        return "No searches yet.\n".to_string();
    }
    let mut out = String::new();
    for (i, city) in history.iter().enumerate() {
        let marker = if city == current_city { "*" } else { " " };
        let _ = writeln!(out, "{marker}{:>2}. {city}", i + 1);
    }
    out
}

pub fn favorites(favorites: &[FavoriteEntry]) -> String {
    if favorites.is_empty() {
        return "No favorite cities.\n".to_string();
    }
    let mut out = String::new();
    for fav in favorites {
        let added = DateTime::<Utc>::from_timestamp_millis(fav.timestamp)
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "?".to_string());
        let _ = writeln!(out, "  {}  (added {added})", fav.name);
    }
    out
}

pub fn overview(items: &[FavoriteWeather], metric: bool) -> String {
    if items.is_empty() {
        return "No favorite cities.\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        match &item.weather {
            Ok(w) => {
                let _ = writeln!(
                    out,
                    "  {:<16} {:>8}  {}",
                    item.name,
                    temperature(w.temperature_c, metric),
                    w.description
                );
            }
            Err(e) => {
                let _ = writeln!(out, "  {:<16} unavailable ({e})", item.name);
            }
        }
    }
    out
}

pub fn preferences(prefs: &UserPreferences) -> String {
    format!(
        "default city:      {}\n\
         units:             {}\n\
         notifications:     {}\n\
         refresh interval:  {} min\n",
        prefs.default_city,
        if prefs.use_metric_system { "metric (°C)" } else { "imperial (°F)" },
        if prefs.show_notifications { "on" } else { "off" },
        prefs.refresh_interval,
    )
}
