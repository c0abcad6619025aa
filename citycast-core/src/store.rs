//! The client-side state container.
//!
//! [`SearchStore`] owns the search history, favorites, preferences and the
//! weather cache. Every mutation is two steps: [`SearchStore::apply`] updates
//! memory synchronously, then [`SearchStore::persist`] writes the affected
//! collection to the key-value store. Readers see the new state as soon as
//! `apply` returns, before the write completes.
//!
//! Each collection has its own write gate and `persist` always writes the
//! collection's *current* value, so overlapping mutations cannot leave an
//! older snapshot as the durable copy.

use chrono::Duration;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info, warn};

use crate::{
    cache::{DEFAULT_TTL_SECS, WeatherCache},
    clock::Clock,
    error::{FetchError, StorageError, StoreError},
    model::{CityWeather, FavoriteEntry, PreferencesPatch, UserPreferences, WeatherSnapshot},
    provider::WeatherSource,
    storage::KeyValueStore,
};

mod state;

pub use state::{Collection, Mutation, StoreState};
use state::{normalize_favorites, normalize_history};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    /// Maximum number of remembered searches.
    pub history_limit: usize,
    /// Freshness window of cached weather.
    pub cache_ttl: Duration,
    /// Preferences used until (and unless) persisted ones are loaded.
    pub default_preferences: UserPreferences,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            cache_ttl: Duration::seconds(DEFAULT_TTL_SECS),
            default_preferences: UserPreferences::default(),
        }
    }
}

/// Current conditions for one favorite, or why they could not be fetched.
#[derive(Debug)]
pub struct FavoriteWeather {
    pub name: String,
    pub weather: Result<WeatherSnapshot, FetchError>,
}

#[derive(Debug, Default)]
struct WriteGates {
    history: tokio::sync::Mutex<()>,
    favorites: tokio::sync::Mutex<()>,
    preferences: tokio::sync::Mutex<()>,
}

impl WriteGates {
    fn for_collection(&self, collection: Collection) -> &tokio::sync::Mutex<()> {
        match collection {
            Collection::History => &self.history,
            Collection::Favorites => &self.favorites,
            Collection::Preferences => &self.preferences,
        }
    }
}

#[derive(Debug)]
pub struct SearchStore {
    state: Mutex<StoreState>,
    cache: Mutex<WeatherCache<CityWeather>>,
    gates: WriteGates,
    hydrated: AtomicBool,
    kv: Arc<dyn KeyValueStore>,
    source: Arc<dyn WeatherSource>,
    clock: Arc<dyn Clock>,
    settings: StoreSettings,
}

impl SearchStore {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        source: Arc<dyn WeatherSource>,
        clock: Arc<dyn Clock>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            state: Mutex::new(StoreState::new(settings.default_preferences.clone())),
            cache: Mutex::new(WeatherCache::new(settings.cache_ttl, clock.clone())),
            gates: WriteGates::default(),
            hydrated: AtomicBool::new(false),
            kv,
            source,
            clock,
            settings,
        }
    }

    pub fn snapshot(&self) -> StoreState {
        self.state.lock().clone()
    }

    pub fn city(&self) -> String {
        self.state.lock().city.clone()
    }

    pub fn search_history(&self) -> Vec<String> {
        self.state.lock().search_history.clone()
    }

    pub fn favorites(&self) -> Vec<FavoriteEntry> {
        self.state.lock().favorites.clone()
    }

    pub fn preferences(&self) -> UserPreferences {
        self.state.lock().preferences.clone()
    }

    pub fn is_favorite(&self, city: &str) -> bool {
        self.state.lock().is_favorite(city)
    }

    /// True once [`SearchStore::load_search_history`] has completed.
    pub fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }

    /// Hydrate history, then favorites and preferences.
    ///
    /// Never fails: unreadable or corrupt values are logged and replaced by
    /// empty collections or defaults.
    pub async fn load_search_history(&self) {
        let history = match self.read_collection::<Vec<String>>(Collection::History).await {
            Ok(Some(history)) => normalize_history(history, self.settings.history_limit),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to load search history, starting empty");
                Vec::new()
            }
        };
        self.state.lock().search_history = history;

        self.load_favorites().await;
        self.load_preferences().await;

        self.hydrated.store(true, Ordering::Release);

        let state = self.snapshot();
        info!(
            history = state.search_history.len(),
            favorites = state.favorites.len(),
            city = %state.city,
            "store hydrated"
        );
    }

    pub async fn load_favorites(&self) {
        let favorites = match self.read_collection::<Vec<FavoriteEntry>>(Collection::Favorites).await {
            Ok(Some(favorites)) => normalize_favorites(favorites),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to load favorites, starting empty");
                Vec::new()
            }
        };
        self.state.lock().favorites = favorites;
    }

    /// Replace preferences with the persisted record and select its default
    /// city. Absent or unreadable records leave memory untouched.
    ///
    /// Fields missing from an older record take their built-in defaults.
    pub async fn load_preferences(&self) {
        match self.read_collection::<PreferencesPatch>(Collection::Preferences).await {
            Ok(Some(patch)) => {
                let preferences = self.settings.default_preferences.merged(&patch);
                let mut state = self.state.lock();
                state.city = preferences.default_city.clone();
                state.preferences = preferences;
            }
            Ok(None) => debug!("no stored preferences, keeping defaults"),
            Err(e) => warn!(error = %e, "failed to load preferences, keeping current"),
        }
    }

    async fn read_collection<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> Result<Option<T>, StorageError> {
        let key = collection.key();
        let Some(raw) = self.kv.get_item(key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Serde {
                key: key.to_string(),
                source,
            })
    }

    /// Apply `mutation` to memory. Returns the collection that now needs to
    /// be persisted.
    pub fn apply(&self, mutation: &Mutation) -> Collection {
        self.state.lock().apply(mutation, self.settings.history_limit);
        mutation.collection()
    }

    /// Write the current in-memory value of `collection`.
    ///
    /// Safe to retry after a failure.
    pub async fn persist(&self, collection: Collection) -> Result<(), StoreError> {
        let _gate = self.gates.for_collection(collection).lock().await;

        let key = collection.key();
        let payload = self
            .state
            .lock()
            .payload(collection)
            .map_err(|source| StoreError::Storage {
                collection,
                source: StorageError::Serde {
                    key: key.to_string(),
                    source,
                },
            })?;

        let written = match payload {
            Some(payload) => self.kv.set_item(key, payload).await,
            None => self.kv.remove_item(key).await,
        };
        written.map_err(|source| StoreError::Storage { collection, source })?;

        debug!(key, "persisted {collection}");
        Ok(())
    }

    /// `apply` then `persist`. A persistence failure is logged and returned,
    /// but the in-memory change stands.
    pub async fn dispatch(&self, mutation: Mutation) -> Result<(), StoreError> {
        let collection = self.apply(&mutation);

        let result = self.persist(collection).await;
        if let Err(e) = &result {
            warn!(error = %e, ?mutation, "in-memory state is ahead of storage");
        }
        result
    }

    /// Select `city` and move it to the front of the history.
    pub async fn save_search(&self, city: &str) -> Result<(), StoreError> {
        let city = checked_city(city)?;
        self.dispatch(Mutation::SaveSearch(city)).await
    }

    /// Drop `city` from the history; absent cities are ignored.
    pub async fn remove_from_history(&self, city: &str) -> Result<(), StoreError> {
        self.dispatch(Mutation::RemoveFromHistory(city.trim().to_string()))
            .await
    }

    /// Empty the history and delete its stored record.
    pub async fn clear_history(&self) -> Result<(), StoreError> {
        self.dispatch(Mutation::ClearHistory).await
    }

    /// Add `city` to favorites, or remove it if already there.
    pub async fn toggle_favorite(&self, city: &str) -> Result<(), StoreError> {
        let name = checked_city(city)?;
        let timestamp = self.clock.now_millis();
        self.dispatch(Mutation::ToggleFavorite { name, timestamp }).await
    }

    pub async fn remove_favorite(&self, city: &str) -> Result<(), StoreError> {
        self.dispatch(Mutation::RemoveFavorite(city.trim().to_string()))
            .await
    }

    /// Merge `patch` over the current preferences. The selected city is not
    /// changed, even when `patch` carries a new default city.
    pub async fn update_preferences(&self, patch: PreferencesPatch) -> Result<(), StoreError> {
        self.dispatch(Mutation::UpdatePreferences(patch)).await
    }

    /// Make `city` the default and select it.
    pub async fn set_default_city(&self, city: &str) -> Result<(), StoreError> {
        let city = checked_city(city)?;
        self.dispatch(Mutation::SetDefaultCity(city)).await
    }

    pub fn set_weather_cache(&self, city: &str, data: CityWeather) {
        self.cache.lock().set(city, data);
    }

    /// Cached weather for `city` if younger than the TTL. Expired entries
    /// are evicted by this call.
    pub fn get_weather_cache(&self, city: &str) -> Option<CityWeather> {
        self.cache.lock().get(city)
    }

    pub fn clear_weather_cache(&self) {
        self.cache.lock().clear();
    }

    /// Weather for `city`, from cache when fresh, otherwise fetched and
    /// cached. Fetch errors leave the cache untouched.
    pub async fn weather_for(&self, city: &str) -> Result<CityWeather, StoreError> {
        if let Some(hit) = self.get_weather_cache(city) {
            debug!(city, "weather cache hit");
            return Ok(hit);
        }

        debug!(city, "weather cache miss, fetching");
        let (current, forecast) = tokio::try_join!(
            self.source.fetch_current_weather(city),
            self.source.fetch_forecast(city),
        )?;

        let data = CityWeather { current, forecast };
        self.set_weather_cache(city, data.clone());
        Ok(data)
    }

    /// Current conditions for every favorite, in favorites order. One
    /// failing city does not affect the others.
    pub async fn favorites_overview(&self) -> Vec<FavoriteWeather> {
        let names: Vec<String> = self
            .state
            .lock()
            .favorites
            .iter()
            .map(|f| f.name.clone())
            .collect();

        join_all(names.into_iter().map(|name| async move {
            let weather = match self.get_weather_cache(&name) {
                Some(cached) => Ok(cached.current),
                None => self.source.fetch_current_weather(&name).await,
            };
            if let Err(e) = &weather {
                warn!(city = %name, error = %e, "failed to fetch favorite");
            }
            FavoriteWeather { name, weather }
        }))
        .await
    }
}

fn checked_city(city: &str) -> Result<String, StoreError> {
    let trimmed = city.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidCity);
    }
    Ok(trimmed.to_string())
}
