use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current conditions for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub description: String,
    /// Provider icon code, e.g. `"10d"`.
    pub icon: String,
    /// Coarse condition group, e.g. `"Rain"`.
    pub main: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed_mps: f64,
    pub wind_deg: u16,
    pub cloudiness_pct: u8,
    pub visibility_m: u32,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

/// One 3-hourly step of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub at: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub humidity_pct: u8,
    pub description: String,
    pub icon: String,
    pub main: String,
    pub wind_speed_mps: f64,
    /// Probability of precipitation, 0.0 to 1.0.
    pub precipitation_probability: f64,
}

/// Multi-day forecast for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub city: String,
    pub country: String,
    /// Shift of the city's local time from UTC, in seconds.
    pub timezone_offset_secs: i32,
    pub entries: Vec<ForecastEntry>,
}

/// Per-day aggregate of forecast entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub min_c: f64,
    pub max_c: f64,
    pub description: String,
    pub icon: String,
    pub precipitation_probability: f64,
}

impl ForecastSnapshot {
    /// The next `limit` forecast steps, nearest first.
    pub fn hourly(&self, limit: usize) -> &[ForecastEntry] {
        let end = limit.min(self.entries.len());
        &self.entries[..end]
    }

    /// Collapse the 3-hourly steps into one summary per local calendar day.
    ///
    /// The description and icon come from the step closest to local midday.
    pub fn daily(&self) -> Vec<DailySummary> {
        let offset = Duration::seconds(i64::from(self.timezone_offset_secs));
        let mut days: BTreeMap<NaiveDate, Vec<(&ForecastEntry, u32)>> = BTreeMap::new();

        for entry in &self.entries {
            let local = (entry.at + offset).naive_utc();
            days.entry(local.date())
                .or_default()
                .push((entry, local.time().num_seconds_from_midnight()));
        }

        days.into_iter()
            .filter_map(|(date, steps)| {
                let (representative, _) = steps
                    .iter()
                    .min_by_key(|(_, secs)| secs.abs_diff(MIDDAY_SECS))?;

                let min_c = steps
                    .iter()
                    .map(|(e, _)| e.temp_min_c)
                    .fold(f64::INFINITY, f64::min);
                let max_c = steps
                    .iter()
                    .map(|(e, _)| e.temp_max_c)
                    .fold(f64::NEG_INFINITY, f64::max);
                let precipitation_probability = steps
                    .iter()
                    .map(|(e, _)| e.precipitation_probability)
                    .fold(0.0, f64::max);

                Some(DailySummary {
                    date,
                    min_c,
                    max_c,
                    description: representative.description.clone(),
                    icon: representative.icon.clone(),
                    precipitation_probability,
                })
            })
            .collect()
    }
}

const MIDDAY_SECS: u32 = 12 * 60 * 60;

/// Current conditions and forecast fetched together for one city. This is the
/// payload held by the weather cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityWeather {
    pub current: WeatherSnapshot,
    pub forecast: ForecastSnapshot,
}

/// A favorited city and the instant (epoch milliseconds) it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub name: String,
    pub timestamp: i64,
}

/// User preferences, always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub default_city: String,
    pub use_metric_system: bool,
    pub show_notifications: bool,
    /// Minutes between automatic refreshes.
    pub refresh_interval: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_city: "Warsaw".to_string(),
            use_metric_system: true,
            show_notifications: true,
            refresh_interval: 30,
        }
    }
}

/// A partial update of [`UserPreferences`]; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_metric_system: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval: Option<u32>,
}

impl PreferencesPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl UserPreferences {
    /// Shallow merge: every field set in `patch` overrides, the rest is kept.
    pub fn merged(&self, patch: &PreferencesPatch) -> Self {
        Self {
            default_city: patch
                .default_city
                .clone()
                .unwrap_or_else(|| self.default_city.clone()),
            use_metric_system: patch.use_metric_system.unwrap_or(self.use_metric_system),
            show_notifications: patch.show_notifications.unwrap_or(self.show_notifications),
            refresh_interval: patch.refresh_interval.unwrap_or(self.refresh_interval),
        }
    }
}
