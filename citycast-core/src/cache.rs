//! Volatile, time-bounded cache of weather responses keyed by city name.
//!
//! Entries are never swept in the background: an entry older than the TTL is
//! dropped the first time it is looked up. Nothing here is persisted.

use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Arc};

use crate::clock::Clock;

/// Default freshness window, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct WeatherCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> WeatherCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            clock,
        }
    }

    /// Insert or overwrite, stamping the entry with the current instant.
    pub fn set(&mut self, city: &str, data: V) {
        let fetched_at = self.clock.now();
        self.entries
            .insert(city.to_string(), CacheEntry { data, fetched_at });
    }

    /// Fresh data for `city`, or `None`. An expired entry is evicted here.
    ///
    /// An entry exactly `ttl` old is still fresh.
    pub fn get(&mut self, city: &str) -> Option<V> {
        let entry = self.entries.get(city)?;
        let age = self.clock.now() - entry.fetched_at;

        if age > self.ttl {
            tracing::debug!(city, age_secs = age.num_seconds(), "weather cache entry expired");
            self.entries.remove(city);
            return None;
        }

        Some(entry.data.clone())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until looked up.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
