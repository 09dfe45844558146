use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::config::CACHE_DURATION;
use crate::error::RateError;
use crate::models::RateSnapshot;

type Slot = Arc<AsyncMutex<Option<Arc<RateSnapshot>>>>;

/// Latest rate table per base currency.
///
/// The outer map is only locked long enough to find or create a key's slot.
/// Each slot is held across its own check-fetch-store sequence, so callers
/// asking for the same base wait for one fetch while other bases proceed.
pub struct RateCache {
    slots: Mutex<HashMap<String, Slot>>,
    ttl: Duration,
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RateCache {
    pub fn new() -> Self {
        Self::with_ttl(CACHE_DURATION)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached snapshot for `base_currency` if still fresh, otherwise
    /// calls `fetch` with the upper-cased code and stores what it returns.
    ///
    /// A failed fetch leaves any previous entry in place.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        base_currency: &str,
        fetch: F,
    ) -> Result<Arc<RateSnapshot>, RateError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<RateSnapshot, RateError>>,
    {
        let key = base_currency.trim().to_uppercase();
        let slot = self.slot(&key);
        let mut entry = slot.lock().await;

        if let Some(snapshot) = entry.as_ref() {
            if self.is_fresh(snapshot) {
                debug!(base = %key, "rate cache hit");
                return Ok(Arc::clone(snapshot));
            }
            debug!(base = %key, "rate cache entry stale");
        } else {
            debug!(base = %key, "rate cache miss");
        }

        let snapshot = Arc::new(fetch(key.clone()).await?);
        *entry = Some(Arc::clone(&snapshot));
        debug!(base = %key, "rate cache refreshed");
        Ok(snapshot)
    }

    /// Number of base currencies that have a slot.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    fn is_fresh(&self, snapshot: &RateSnapshot) -> bool {
        match snapshot.fetched_at.elapsed() {
            Ok(age) => age < self.ttl,
            // fetched_at is ahead of the wall clock
            Err(_) => true,
        }
    }
}
