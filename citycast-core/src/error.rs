use thiserror::Error;

use crate::store::Collection;

/// Failure of a key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on key `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored value for key `{key}` is not valid JSON: {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Failure of a remote weather lookup.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Weather request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Weather service responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse weather response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Weather source is not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for FetchError {
    /// Request URLs carry the API key, so they are stripped here.
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err.without_url())
    }
}

/// Error surfaced at the store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to persist {collection}: {source}")]
    Storage {
        collection: Collection,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("City name must not be empty")]
    InvalidCity,
}

impl StoreError {
    /// True when the underlying cause is an unknown city, which callers
    /// usually present differently from transport failures.
    pub fn is_city_not_found(&self) -> bool {
        matches!(self, StoreError::Fetch(FetchError::CityNotFound(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_names_collection() {
        let err = StoreError::Storage {
            collection: Collection::Favorites,
            source: StorageError::Backend("disk full".into()),
        };

        let msg = err.to_string();
        assert!(msg.contains("favorites"));
        assert!(!err.is_city_not_found());
    }

    #[test]
    fn fetch_error_is_transparent() {
        let err = StoreError::from(FetchError::CityNotFound("Atlantis".into()));

        assert_eq!(err.to_string(), "City not found: Atlantis");
        assert!(err.is_city_not_found());
    }
}
