//! Query controller
//!
//! Serves reads by combining the cache store and the remote service. Fresh
//! entries are served without a network call; stale entries are served
//! immediately while a background refresh runs; misses are fetched while the
//! caller observes the loading state. Concurrent reads for the same key
//! coalesce into a single in-flight fetch, and every waiting caller observes
//! the same resolution.
//!
//! The controller never retries on its own. A failed read stays in the error
//! state until something re-invokes it (a manual retry or a focus
//! revalidation).

use crate::api::CatalogApi;
use crate::cache::{CacheEntry, CacheKey, CacheStore, CacheValue, QueryStatus};
use crate::error::Result;
use crate::product::Product;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

type SharedFetch = Shared<BoxFuture<'static, Result<CacheValue>>>;

/// An in-flight fetch plus the generation it started under
struct InflightFetch {
    started_at: u64,
    fetch: SharedFetch,
}

/// Per-read parameters
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Age limit under which cached data is served without a network call
    pub stale_time: Duration,
    /// Refresh this read on a window-focus event while it is active
    pub refetch_on_focus: bool,
    /// A disabled read reports idle and never touches the network
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300),
            refetch_on_focus: true,
            enabled: true,
        }
    }
}

impl QueryOptions {
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_refetch_on_focus(mut self, refetch_on_focus: bool) -> Self {
        self.refetch_on_focus = refetch_on_focus;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Point-in-time view of one read, as served to the caller
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub key: CacheKey,
    pub status: QueryStatus,
    pub data: Option<CacheValue>,
    pub error: Option<String>,
}

impl QuerySnapshot {
    fn idle(key: CacheKey, data: Option<CacheValue>) -> Self {
        Self {
            key,
            status: QueryStatus::Idle,
            data,
            error: None,
        }
    }

    fn from_entry(key: CacheKey, entry: &CacheEntry) -> Self {
        Self {
            key,
            status: entry.status,
            data: entry.data.clone(),
            error: entry.error.clone(),
        }
    }

    pub fn products(&self) -> Option<&[Product]> {
        self.data.as_ref().and_then(CacheValue::as_products)
    }

    pub fn product(&self) -> Option<&Product> {
        self.data.as_ref().and_then(CacheValue::as_product)
    }

    pub fn categories(&self) -> Option<&[String]> {
        self.data.as_ref().and_then(CacheValue::as_categories)
    }
}

/// Orchestrates reads against the cache store and the remote service
pub struct QueryController {
    store: Arc<CacheStore>,
    api: Arc<dyn CatalogApi>,
    /// One shared future per key with a fetch currently in flight
    inflight: Arc<Mutex<HashMap<CacheKey, InflightFetch>>>,
    /// Reads currently active (enabled), eligible for focus revalidation
    active: Mutex<HashMap<CacheKey, QueryOptions>>,
}

impl QueryController {
    pub fn new(store: Arc<CacheStore>, api: Arc<dyn CatalogApi>) -> Self {
        Self {
            store,
            api,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Serve a read for `key` per the cache/network algorithm
    ///
    /// On a miss the call resolves once the fetch settles; on a stale hit the
    /// cached value is returned immediately and the refresh runs in the
    /// background.
    pub async fn read(&self, key: CacheKey, options: QueryOptions) -> QuerySnapshot {
        self.store.evict_expired();

        if !options.enabled {
            self.active
                .lock()
                .expect("active query lock poisoned")
                .remove(&key);
            let data = self.store.peek(&key).and_then(|entry| entry.data);
            return QuerySnapshot::idle(key, data);
        }

        self.active
            .lock()
            .expect("active query lock poisoned")
            .insert(key, options);

        let now = Instant::now();
        match self.store.get(&key) {
            Some(entry) if entry.data.is_some() => {
                if entry.is_fresh_within(now, options.stale_time) {
                    QuerySnapshot::from_entry(key, &entry)
                } else {
                    // Serve the cached value immediately; refresh concurrently.
                    let fetch = self.coalesced_fetch(key, options.stale_time);
                    tokio::spawn(fetch.map(|_| ()));
                    QuerySnapshot::from_entry(key, &entry)
                }
            }
            _ => {
                let fetch = self.coalesced_fetch(key, options.stale_time);
                let _ = fetch.await;
                self.snapshot(&key)
            }
        }
    }

    /// Force a refetch for `key`, coalescing with any in-flight fetch
    ///
    /// This is the manual-retry and focus-revalidation path.
    pub async fn refresh(&self, key: CacheKey) -> QuerySnapshot {
        let stale_time = self
            .active
            .lock()
            .expect("active query lock poisoned")
            .get(&key)
            .map(|options| options.stale_time)
            .unwrap_or_else(|| self.store.default_stale_after());
        let fetch = self.coalesced_fetch(key, stale_time);
        let _ = fetch.await;
        self.snapshot(&key)
    }

    /// Refresh every active read that opted into focus revalidation
    pub async fn revalidate_active(&self) {
        let keys: Vec<CacheKey> = self
            .active
            .lock()
            .expect("active query lock poisoned")
            .iter()
            .filter(|(_, options)| options.refetch_on_focus)
            .map(|(key, _)| *key)
            .collect();
        debug!("focus revalidation for {} active read(s)", keys.len());
        for key in keys {
            self.refresh(key).await;
        }
    }

    /// Read the product list
    pub async fn products(&self, options: QueryOptions) -> QuerySnapshot {
        self.read(CacheKey::Products, options).await
    }

    /// Read a single product
    pub async fn product(&self, id: u64, options: QueryOptions) -> QuerySnapshot {
        self.read(CacheKey::Product(id), options).await
    }

    /// Read the category names
    pub async fn categories(&self, options: QueryOptions) -> QuerySnapshot {
        self.read(CacheKey::Categories, options).await
    }

    /// Current cache state for a key, without network activity
    pub fn snapshot(&self, key: &CacheKey) -> QuerySnapshot {
        match self.store.peek(key) {
            Some(entry) => QuerySnapshot::from_entry(*key, &entry),
            None => QuerySnapshot::idle(*key, None),
        }
    }

    /// Join or start the single in-flight fetch for a key
    ///
    /// The resolution is applied to the store only if the key's generation is
    /// unchanged; a mutation that started in the meantime wins.
    fn coalesced_fetch(&self, key: CacheKey, stale_time: Duration) -> SharedFetch {
        let mut inflight = self.inflight.lock().expect("inflight lock poisoned");
        let generation = self.store.generation(&key);
        if let Some(existing) = inflight.get(&key) {
            // Join only a fetch whose resolution will still be applied. A
            // mutation may have cancelled the in-flight one; joining it would
            // turn a retry into a silent no-op.
            if existing.started_at == generation {
                return existing.fetch.clone();
            }
        }

        self.store.mark_loading(key, stale_time);
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let inflight_map = Arc::clone(&self.inflight);

        let fetch = async move {
            let result = fetch_value(api.as_ref(), &key).await;
            let mut inflight = inflight_map.lock().expect("inflight lock poisoned");
            // A cancelled fetch must not deregister its replacement.
            if inflight
                .get(&key)
                .is_some_and(|entry| entry.started_at == generation)
            {
                inflight.remove(&key);
            }
            drop(inflight);
            match &result {
                Ok(value) => {
                    store.set_if_current(key, generation, value.clone());
                }
                Err(error) => {
                    store.set_error_if_current(key, generation, &error.to_string());
                }
            }
            result
        }
        .boxed()
        .shared();

        inflight.insert(
            key,
            InflightFetch {
                started_at: generation,
                fetch: fetch.clone(),
            },
        );
        fetch
    }
}

/// Dispatch the fetch function matching a key
async fn fetch_value(api: &dyn CatalogApi, key: &CacheKey) -> Result<CacheValue> {
    match key {
        CacheKey::Products => api.list_products().await.map(CacheValue::Products),
        CacheKey::Product(id) => api
            .get_product(*id)
            .await
            .map(|product| CacheValue::Product(Box::new(product))),
        CacheKey::Categories => api.list_categories().await.map(CacheValue::Categories),
    }
}
