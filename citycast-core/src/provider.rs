use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{
    Config,
    error::FetchError,
    model::{ForecastSnapshot, WeatherSnapshot},
    provider::openweather::OpenWeatherSource,
};

pub mod openweather;

/// Remote lookup of weather data by city name.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_current_weather(&self, city: &str) -> Result<WeatherSnapshot, FetchError>;

    /// Multi-day forecast in 3-hour steps.
    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSnapshot, FetchError>;
}

/// Stand-in used when no API key is configured: every lookup fails with
/// [`FetchError::NotConfigured`], while history, favorites and preferences
/// keep working.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

const CONFIGURE_HINT: &str = "run `citycast configure` and enter your OpenWeather API key";

#[async_trait]
impl WeatherSource for OfflineSource {
    async fn fetch_current_weather(&self, _city: &str) -> Result<WeatherSnapshot, FetchError> {
        Err(FetchError::NotConfigured(CONFIGURE_HINT.to_string()))
    }

    async fn fetch_forecast(&self, _city: &str) -> Result<ForecastSnapshot, FetchError> {
        Err(FetchError::NotConfigured(CONFIGURE_HINT.to_string()))
    }
}

/// Construct the weather source described by `config`.
pub fn source_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherSource>> {
    let api_key = config.api_key.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
             Hint: run `citycast configure` and enter your OpenWeather API key."
        )
    })?;

    let source = OpenWeatherSource::builder(api_key)
        .base_url(&config.base_url)
        .language(&config.language)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    Ok(Arc::new(source))
}
