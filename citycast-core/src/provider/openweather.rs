use async_trait::async_trait;
use chrono::{DateTime, Utc, serde::ts_seconds};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;

use crate::{
    error::FetchError,
    model::{ForecastEntry, ForecastSnapshot, WeatherSnapshot},
};

use super::WeatherSource;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_LANGUAGE: &str = "pl";

/// OpenWeather 2.5 REST API, always queried in metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    base_url: String,
    language: String,
    http: Client,
}

#[derive(Debug, Clone)]
pub struct OpenWeatherSourceBuilder {
    api_key: String,
    base_url: String,
    language: String,
    timeout: Duration,
}

impl OpenWeatherSourceBuilder {
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenWeatherSource, FetchError> {
        let http = Client::builder().timeout(self.timeout).build()?;

        Ok(OpenWeatherSource {
            api_key: self.api_key,
            base_url: self.base_url,
            language: self.language,
            http,
        })
    }
}

impl OpenWeatherSource {
    pub fn builder(api_key: &str) -> OpenWeatherSourceBuilder {
        OpenWeatherSourceBuilder {
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, city: &str) -> Result<T, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("units", "metric"),
                ("lang", self.language.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::CityNotFound(city.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    #[serde(default)]
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: u16,
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    #[serde(with = "ts_seconds")]
    sunrise: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    sunset: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    #[serde(with = "ts_seconds")]
    dt: DateTime<Utc>,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    #[serde(default)]
    visibility: u32,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    #[serde(with = "ts_seconds")]
    dt: DateTime<Utc>,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

/// First weather condition, or placeholders when the provider sent none.
fn primary_condition(weather: &[OwWeather]) -> (String, String, String) {
    weather
        .first()
        .map(|w| (w.description.clone(), w.icon.clone(), w.main.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), String::new(), "Unknown".to_string()))
}

impl From<OwCurrentResponse> for WeatherSnapshot {
    fn from(raw: OwCurrentResponse) -> Self {
        let (description, icon, main) = primary_condition(&raw.weather);

        WeatherSnapshot {
            city: raw.name,
            country: raw.sys.country,
            description,
            icon,
            main,
            temperature_c: raw.main.temp,
            feels_like_c: raw.main.feels_like,
            temp_min_c: raw.main.temp_min,
            temp_max_c: raw.main.temp_max,
            humidity_pct: raw.main.humidity,
            pressure_hpa: raw.main.pressure,
            wind_speed_mps: raw.wind.speed,
            wind_deg: raw.wind.deg,
            cloudiness_pct: raw.clouds.all,
            visibility_m: raw.visibility,
            sunrise: raw.sys.sunrise,
            sunset: raw.sys.sunset,
            observed_at: raw.dt,
        }
    }
}

impl From<OwForecastResponse> for ForecastSnapshot {
    fn from(raw: OwForecastResponse) -> Self {
        let entries = raw
            .list
            .into_iter()
            .map(|e| {
                let (description, icon, main) = primary_condition(&e.weather);
                ForecastEntry {
                    at: e.dt,
                    temperature_c: e.main.temp,
                    feels_like_c: e.main.feels_like,
                    temp_min_c: e.main.temp_min,
                    temp_max_c: e.main.temp_max,
                    humidity_pct: e.main.humidity,
                    description,
                    icon,
                    main,
                    wind_speed_mps: e.wind.speed,
                    precipitation_probability: e.pop,
                }
            })
            .collect();

        ForecastSnapshot {
            city: raw.city.name,
            country: raw.city.country,
            timezone_offset_secs: raw.city.timezone,
            entries,
        }
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn fetch_current_weather(&self, city: &str) -> Result<WeatherSnapshot, FetchError> {
        let raw: OwCurrentResponse = self.get_json("weather", city).await?;
        Ok(raw.into())
    }

    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSnapshot, FetchError> {
        let raw: OwForecastResponse = self.get_json("forecast", city).await?;
        Ok(raw.into())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
