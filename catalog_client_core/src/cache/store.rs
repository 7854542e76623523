//! Keyed in-memory cache store
//!
//! The store is the single shared mutable resource of the sync layer. It is
//! created explicitly at application startup, handed by `Arc` to the query
//! and mutation controllers, and discarded with the process; nothing is
//! persisted.
//!
//! Every operation is a synchronous in-memory mutation that never suspends,
//! so each one is atomic with respect to the async tasks interleaving around
//! it. Ordering across await points is enforced by generation counters: a
//! fetch records the generation of its key when it starts, and its resolution
//! is dropped if the generation moved in the meantime (a mutation cancelled
//! the read). Entries and generations live under one lock, so the generation
//! compare and the entry write happen under a single guard and hold on a
//! multi-threaded runtime too.

use crate::cache::{CacheEntry, CacheKey, CacheValue, KeyScope, QueryStatus};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

/// Default freshness and eviction windows for new entries
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Age past which data becomes eligible for background refresh
    pub stale_after: Duration,
    /// Idle time after which an unused entry may be evicted
    pub expires_after: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(300),
            expires_after: Duration::from_secs(1800),
        }
    }
}

/// Hit/miss counters for the store
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub entry_count: usize,
}

/// Snapshot of every cache entry a mutation will touch
///
/// Captured before the optimistic apply and used exclusively for rollback.
/// The context is consumed when the mutation settles: committed contexts are
/// dropped, failed ones are passed back to [`CacheStore::restore`].
#[derive(Debug)]
pub struct MutationContext {
    snapshots: Vec<(CacheKey, Option<CacheEntry>)>,
}

impl MutationContext {
    /// Keys covered by this context
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.snapshots.iter().map(|(key, _)| key)
    }
}

#[derive(Default)]
struct StoreInner {
    entries: HashMap<CacheKey, CacheEntry>,
    // Generations survive entry removal so a stale fetch cannot resurrect a
    // deleted entry.
    generations: HashMap<CacheKey, u64>,
}

/// Keyed storage of [`CacheEntry`] values
pub struct CacheStore {
    inner: RwLock<StoreInner>,
    stats: RwLock<CacheStats>,
    policy: CachePolicy,
}

impl CacheStore {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            stats: RwLock::new(CacheStats::default()),
            policy,
        }
    }

    /// Default freshness window for entries in this store
    pub fn default_stale_after(&self) -> Duration {
        self.policy.stale_after
    }

    /// Read the entry for a key, updating access metadata and hit/miss stats
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        let mut stats = self.stats.write().expect("cache store lock poisoned");
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = Instant::now();
                if entry.data.is_some() {
                    stats.hit_count += 1;
                } else {
                    stats.miss_count += 1;
                }
                Some(entry.clone())
            }
            None => {
                stats.miss_count += 1;
                None
            }
        }
    }

    /// Read the entry for a key without touching access metadata or stats
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner
            .read()
            .expect("cache store lock poisoned")
            .entries
            .get(key)
            .cloned()
    }

    /// Replace the entry's data with a successful result
    ///
    /// Sets `status = Success`, stamps `fetched_at`, and clears any previous
    /// error. Used both for confirmed fetch results and for optimistic
    /// mutation writes, which are treated as if the network call had already
    /// succeeded.
    pub fn set(&self, key: CacheKey, data: CacheValue) {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        self.apply_success(&mut inner, key, data);
        self.sync_entry_count(&inner.entries);
    }

    /// Record a failed fetch, leaving any stale data intact so callers can
    /// show the last-known value alongside the error
    pub fn set_error(&self, key: CacheKey, message: impl Into<String>) {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        self.apply_error(&mut inner, key, message.into());
        self.sync_entry_count(&inner.entries);
    }

    /// Transition a key into the loading state ahead of a fetch, creating the
    /// entry if it does not exist
    pub fn mark_loading(&self, key: CacheKey, stale_after: Duration) {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        let entry = inner
            .entries
            .entry(key)
            .or_insert_with(|| CacheEntry::new(stale_after, self.policy.expires_after));
        entry.status = QueryStatus::Loading;
        entry.stale_after = stale_after;
        entry.last_accessed = Instant::now();
        self.sync_entry_count(&inner.entries);
    }

    /// Delete the entry entirely (e.g. a deleted product's detail entry)
    pub fn remove(&self, key: &CacheKey) {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        inner.entries.remove(key);
        debug!("cache remove: {key}");
        self.sync_entry_count(&inner.entries);
    }

    /// Mark matching entries' freshness window as elapsed, so the next read
    /// triggers a background refresh while still serving cached data
    pub fn invalidate(&self, scope: KeyScope) {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        for (key, entry) in inner.entries.iter_mut() {
            if key.in_scope(scope) {
                entry.stale_after = Duration::ZERO;
                trace!("cache invalidate: {key}");
            }
        }
    }

    /// Current generation for a key
    pub fn generation(&self, key: &CacheKey) -> u64 {
        self.inner
            .read()
            .expect("cache store lock poisoned")
            .generations
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Cancel in-flight reads for a key by bumping its generation
    ///
    /// The underlying network requests still run to completion, but their
    /// resolutions no longer match and are dropped.
    pub fn cancel_in_flight(&self, key: &CacheKey) {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        let counter = inner.generations.entry(*key).or_insert(0);
        *counter += 1;
        debug!("cancelled in-flight reads for {key} (generation {counter})");
    }

    /// Apply a successful fetch resolution unless the read was cancelled
    ///
    /// The generation compare and the write happen under one guard, so a
    /// concurrent cancel cannot slip between them. Returns `false` when the
    /// resolution was dropped as stale.
    pub fn set_if_current(&self, key: CacheKey, started_at: u64, data: CacheValue) -> bool {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        if inner.generations.get(&key).copied().unwrap_or(0) != started_at {
            debug!("dropping stale fetch result for {key}");
            return false;
        }
        self.apply_success(&mut inner, key, data);
        self.sync_entry_count(&inner.entries);
        true
    }

    /// Apply a failed fetch resolution unless the read was cancelled
    pub fn set_error_if_current(&self, key: CacheKey, started_at: u64, message: &str) -> bool {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        if inner.generations.get(&key).copied().unwrap_or(0) != started_at {
            debug!("dropping stale fetch error for {key}");
            return false;
        }
        self.apply_error(&mut inner, key, message.to_string());
        self.sync_entry_count(&inner.entries);
        true
    }

    /// Capture the pre-mutation state of every entry a mutation will touch
    pub fn snapshot(&self, keys: &[CacheKey]) -> MutationContext {
        let inner = self.inner.read().expect("cache store lock poisoned");
        MutationContext {
            snapshots: keys
                .iter()
                .map(|key| (*key, inner.entries.get(key).cloned()))
                .collect(),
        }
    }

    /// Restore every entry covered by the context to its snapshotted state
    ///
    /// Entries absent at capture time are removed again, so a rollback leaves
    /// no trace of the optimistic apply.
    pub fn restore(&self, context: MutationContext) {
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        for (key, snapshot) in context.snapshots {
            match snapshot {
                Some(entry) => {
                    inner.entries.insert(key, entry);
                }
                None => {
                    inner.entries.remove(&key);
                }
            }
            trace!("cache rollback: {key}");
        }
        self.sync_entry_count(&inner.entries);
    }

    /// Evict entries unused longer than their expiry window
    ///
    /// Loading entries are kept; their in-flight fetch is about to refresh
    /// them anyway.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        let mut inner = self.inner.write().expect("cache store lock poisoned");
        inner.entries.retain(|key, entry| {
            let keep = entry.status == QueryStatus::Loading || !entry.is_expired(now);
            if !keep {
                debug!("evicting expired cache entry: {key}");
            }
            keep
        });
        self.sync_entry_count(&inner.entries);
    }

    /// Current hit/miss statistics
    pub fn stats(&self) -> CacheStats {
        self.stats.read().expect("cache store lock poisoned").clone()
    }

    fn apply_success(&self, inner: &mut StoreInner, key: CacheKey, data: CacheValue) {
        let entry = inner
            .entries
            .entry(key)
            .or_insert_with(|| CacheEntry::new(self.policy.stale_after, self.policy.expires_after));
        entry.data = Some(data);
        entry.status = QueryStatus::Success;
        entry.error = None;
        entry.fetched_at = Some(Instant::now());
        entry.last_accessed = Instant::now();
        trace!("cache set: {key}");
    }

    fn apply_error(&self, inner: &mut StoreInner, key: CacheKey, message: String) {
        let entry = inner
            .entries
            .entry(key)
            .or_insert_with(|| CacheEntry::new(self.policy.stale_after, self.policy.expires_after));
        entry.status = QueryStatus::Error;
        entry.error = Some(message);
        entry.last_accessed = Instant::now();
    }

    fn sync_entry_count(&self, entries: &HashMap<CacheKey, CacheEntry>) {
        self.stats
            .write()
            .expect("cache store lock poisoned")
            .entry_count = entries.len();
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
