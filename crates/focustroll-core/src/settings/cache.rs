//! Cached settings snapshot with single-flight fetch.
//!
//! The fetch lock is held across the store call, so concurrent readers wait
//! on the one in-flight request instead of issuing duplicates. Invalidation
//! happens exactly on an external change notification; the next reader
//! refetches.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::store::SettingsStore;
use super::Settings;
use crate::error::SettingsError;

pub struct SettingsCache {
    store: Arc<dyn SettingsStore>,
    cached: Mutex<Option<Arc<Settings>>>,
}

impl SettingsCache {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Current snapshot, fetching at most once no matter how many callers
    /// arrive while the fetch is in flight.
    pub async fn get(&self) -> Result<Arc<Settings>, SettingsError> {
        let mut cached = self.cached.lock().await;
        if let Some(snapshot) = cached.as_ref() {
            return Ok(snapshot.clone());
        }
        let fresh = Arc::new(self.store.get().await?);
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the snapshot; the next `get` refetches.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
