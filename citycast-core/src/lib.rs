//! Core library for the `citycast` weather client.
//!
//! This crate defines:
//! - The search/favorites/preferences store and its weather cache
//! - Key-value persistence backends the store hydrates from and writes to
//! - Abstraction over weather sources (OpenWeather by default)
//! - Configuration and shared domain models
//!
//! It is used by `citycast-cli`, but can also back other front ends.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod storage;
pub mod store;

pub use cache::WeatherCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{FetchError, StorageError, StoreError};
pub use model::{
    CityWeather, DailySummary, FavoriteEntry, ForecastEntry, ForecastSnapshot, PreferencesPatch,
    UserPreferences, WeatherSnapshot,
};
pub use provider::{OfflineSource, WeatherSource, openweather::OpenWeatherSource, source_from_config};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{Collection, FavoriteWeather, Mutation, SearchStore, StoreSettings, StoreState};
