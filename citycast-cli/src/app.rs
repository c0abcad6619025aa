use anyhow::{Context, Result};
use citycast_core::{
    Config, FileStore, OfflineSource, SearchStore, StoreError, SystemClock, WeatherSource,
    source_from_config,
};
use std::sync::Arc;

/// A loaded config plus a hydrated store.
pub struct App {
    pub store: SearchStore,
}

impl App {
    /// Build the store over the on-disk key-value directory and hydrate it.
    ///
    /// Without an API key the store still works for history, favorites and
    /// preferences; weather lookups then fail with a configuration hint.
    pub async fn open(config: &Config) -> Result<Self> {
        let data_dir = config.resolved_data_dir()?;

        let source: Arc<dyn WeatherSource> = match source_from_config(config) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!(error = %e, "weather source unavailable, running offline");
                Arc::new(OfflineSource)
            }
        };

        let store = SearchStore::new(
            Arc::new(FileStore::new(&data_dir)),
            source,
            Arc::new(SystemClock),
            config.store_settings(),
        );
        store.load_search_history().await;
        tracing::debug!(data_dir = %data_dir.display(), "store ready");

        Ok(Self { store })
    }
}

/// Persistence failures are already logged by the store and the in-memory
/// change has been applied, so the command carries on. Anything else aborts.
pub fn tolerate_storage(result: Result<(), StoreError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e @ StoreError::Storage { .. }) => {
            eprintln!("warning: {e}; the change may not survive a restart");
            Ok(())
        }
        Err(e) => Err(e).context("Store operation failed"),
    }
}
