use std::fmt;

use crate::model::{FavoriteEntry, PreferencesPatch, UserPreferences};

/// A persisted collection and its key in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    History,
    Favorites,
    Preferences,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::History,
        Collection::Favorites,
        Collection::Preferences,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Collection::History => "searchHistory",
            Collection::Favorites => "favorites",
            Collection::Preferences => "preferences",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Collection::History => "search history",
            Collection::Favorites => "favorites",
            Collection::Preferences => "preferences",
        })
    }
}

/// A user action that changes store state.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SaveSearch(String),
    RemoveFromHistory(String),
    ClearHistory,
    /// `timestamp` is only used when the city gets added.
    ToggleFavorite { name: String, timestamp: i64 },
    RemoveFavorite(String),
    UpdatePreferences(PreferencesPatch),
    SetDefaultCity(String),
}

impl Mutation {
    /// The collection that must be written after applying this mutation.
    pub fn collection(&self) -> Collection {
        match self {
            Mutation::SaveSearch(_) | Mutation::RemoveFromHistory(_) | Mutation::ClearHistory => {
                Collection::History
            }
            Mutation::ToggleFavorite { .. } | Mutation::RemoveFavorite(_) => Collection::Favorites,
            Mutation::UpdatePreferences(_) | Mutation::SetDefaultCity(_) => Collection::Preferences,
        }
    }
}

/// Everything the store holds in memory apart from the weather cache.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    /// Currently selected city.
    pub city: String,
    /// Most recent first, no duplicates.
    pub search_history: Vec<String>,
    pub favorites: Vec<FavoriteEntry>,
    pub preferences: UserPreferences,
}

impl StoreState {
    pub fn new(preferences: UserPreferences) -> Self {
        Self {
            city: preferences.default_city.clone(),
            search_history: Vec::new(),
            favorites: Vec::new(),
            preferences,
        }
    }

    /// Apply `mutation` in place. Pure: no I/O, no clock reads.
    pub fn apply(&mut self, mutation: &Mutation, history_limit: usize) {
        match mutation {
            Mutation::SaveSearch(name) => {
                self.city = name.clone();
                self.search_history.retain(|c| c != name);
                self.search_history.insert(0, name.clone());
                self.search_history.truncate(history_limit);
            }
            Mutation::RemoveFromHistory(name) => {
                self.search_history.retain(|c| c != name);
            }
            Mutation::ClearHistory => self.search_history.clear(),
            Mutation::ToggleFavorite { name, timestamp } => {
                if self.is_favorite(name) {
                    self.favorites.retain(|f| &f.name != name);
                } else {
                    self.favorites.push(FavoriteEntry {
                        name: name.clone(),
                        timestamp: *timestamp,
                    });
                }
            }
            Mutation::RemoveFavorite(name) => {
                self.favorites.retain(|f| &f.name != name);
            }
            Mutation::UpdatePreferences(patch) => {
                self.preferences = self.preferences.merged(patch);
            }
            Mutation::SetDefaultCity(name) => {
                self.preferences.default_city = name.clone();
                self.city = name.clone();
            }
        }
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.iter().any(|f| f.name == name)
    }

    /// JSON payload stored under `collection.key()`, or `None` when the key
    /// should be removed instead. An empty history is never written.
    pub fn payload(&self, collection: Collection) -> serde_json::Result<Option<String>> {
        let json = match collection {
            Collection::History if self.search_history.is_empty() => return Ok(None),
            Collection::History => serde_json::to_string(&self.search_history)?,
            Collection::Favorites => serde_json::to_string(&self.favorites)?,
            Collection::Preferences => serde_json::to_string(&self.preferences)?,
        };
        Ok(Some(json))
    }
}

/// Drop repeated cities, keeping the first (most recent) occurrence, then cap.
pub(crate) fn normalize_history(history: Vec<String>, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(history.len().min(limit));
    for city in history {
        if out.len() == limit {
            break;
        }
        if !out.contains(&city) {
            out.push(city);
        }
    }
    out
}

/// At most one entry per name; the earliest stored entry wins.
pub(crate) fn normalize_favorites(favorites: Vec<FavoriteEntry>) -> Vec<FavoriteEntry> {
    let mut out: Vec<FavoriteEntry> = Vec::with_capacity(favorites.len());
    for fav in favorites {
        if !out.iter().any(|f| f.name == fav.name) {
            out.push(fav);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> StoreState {
        StoreState::new(UserPreferences::default())
    }

    fn save(state: &mut StoreState, city: &str) {
        state.apply(&Mutation::SaveSearch(city.to_string()), 10);
    }

    #[test]
    fn new_state_selects_default_city() {
        let s = state();

        assert_eq!(s.city, "Warsaw");
        assert!(s.search_history.is_empty());
        assert!(s.favorites.is_empty());
    }

    #[test]
    fn repeated_search_moves_to_front() {
        let mut s = state();

        save(&mut s, "Paris");
        save(&mut s, "Rome");
        save(&mut s, "Paris");

        assert_eq!(s.search_history, vec!["Paris", "Rome"]);
        assert_eq!(s.city, "Paris");
    }

    #[test]
    fn history_never_exceeds_limit_nor_repeats() {
        let mut s = state();
        let cities: Vec<String> = (0..25).map(|i| format!("City{}", i % 13)).collect();

        for (i, city) in cities.iter().enumerate() {
            save(&mut s, city);

            assert!(s.search_history.len() <= 10);
            assert_eq!(s.search_history[0], *city, "step {i}");
            let mut sorted = s.search_history.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), s.search_history.len(), "step {i}");
        }
        // City11 was saved last (24 % 13), City10 before it.
        assert_eq!(s.search_history[..2], ["City11", "City10"]);
    }

    #[test]
    fn cap_drops_oldest_entries() {
        let mut s = state();
        for i in 0..12 {
            save(&mut s, &format!("C{i}"));
        }

        assert_eq!(s.search_history.len(), 10);
        assert_eq!(s.search_history.first().map(String::as_str), Some("C11"));
        assert_eq!(s.search_history.last().map(String::as_str), Some("C2"));
    }

    #[test]
    fn remove_absent_city_is_a_no_op() {
        let mut s = state();
        save(&mut s, "Gdansk");
        save(&mut s, "Poznan");
        let before = s.clone();

        s.apply(&Mutation::RemoveFromHistory("Krakow".into()), 10);

        assert_eq!(s, before);
    }

    #[test]
    fn toggle_twice_restores_favorites() {
        let mut s = state();
        s.apply(
            &Mutation::ToggleFavorite { name: "Oslo".into(), timestamp: 1 },
            10,
        );
        let before = s.favorites.clone();

        for _ in 0..2 {
            s.apply(
                &Mutation::ToggleFavorite { name: "Lima".into(), timestamp: 2 },
                10,
            );
        }
        assert_eq!(s.favorites, before);

        for _ in 0..2 {
            s.apply(
                &Mutation::ToggleFavorite { name: "Oslo".into(), timestamp: 3 },
                10,
            );
        }
        let names: Vec<_> = s.favorites.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Oslo"]);
        assert_eq!(s.favorites[0].timestamp, 3);
    }

    #[test]
    fn set_default_city_updates_preferences_and_city() {
        let mut s = state();

        s.apply(&Mutation::SetDefaultCity("Lodz".into()), 10);

        assert_eq!(s.city, "Lodz");
        assert_eq!(s.preferences.default_city, "Lodz");
        assert!(s.preferences.use_metric_system);
    }

    #[test]
    fn update_preferences_keeps_city() {
        let mut s = state();
        save(&mut s, "Paris");

        s.apply(
            &Mutation::UpdatePreferences(PreferencesPatch {
                default_city: Some("Rome".into()),
                ..Default::default()
            }),
            10,
        );

        assert_eq!(s.city, "Paris");
        assert_eq!(s.preferences.default_city, "Rome");
    }

    #[test]
    fn mutations_map_to_their_collection() {
        assert_eq!(Mutation::ClearHistory.collection(), Collection::History);
        assert_eq!(
            Mutation::RemoveFavorite("x".into()).collection(),
            Collection::Favorites
        );
        assert_eq!(
            Mutation::SetDefaultCity("x".into()).collection(),
            Collection::Preferences
        );
    }

    #[test]
    fn normalize_history_dedups_then_caps() {
        let raw = ["A", "B", "A", "C", "D"].map(String::from).to_vec();

        assert_eq!(normalize_history(raw, 3), vec!["A", "B", "C"]);
    }

    #[test]
    fn normalize_favorites_keeps_first_entry_per_name() {
        let raw = vec![
            FavoriteEntry { name: "A".into(), timestamp: 1 },
            FavoriteEntry { name: "A".into(), timestamp: 2 },
            FavoriteEntry { name: "B".into(), timestamp: 3 },
        ];

        let out = normalize_favorites(raw);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].timestamp, 1);
    }

    #[test]
    fn serialized_keys_match_persisted_layout() {
        let mut s = state();
        save(&mut s, "Paris");

        assert_eq!(Collection::History.key(), "searchHistory");
        assert_eq!(
            s.payload(Collection::History).unwrap().as_deref(),
            Some(r#"["Paris"]"#)
        );
        assert_eq!(s.payload(Collection::Favorites).unwrap().as_deref(), Some("[]"));
        assert!(
            s.payload(Collection::Preferences)
                .unwrap()
                .unwrap()
                .contains(r#""defaultCity":"Warsaw""#)
        );
    }

    #[test]
    fn empty_history_has_no_payload() {
        let mut s = state();
        save(&mut s, "Paris");

        s.apply(&Mutation::ClearHistory, 10);

        assert_eq!(s.payload(Collection::History).unwrap(), None);
    }
}
