//! Caching layer for remote catalog reads
//!
//! One [`CacheEntry`] exists per logical read, identified by a [`CacheKey`].
//! The [`store`] submodule holds the keyed store and the primitives the query
//! and mutation controllers build on.

use crate::product::Product;
use std::time::Duration;
use tokio::time::Instant;

pub mod store;

pub use store::{CacheStats, CacheStore, MutationContext};

/// Identifier for one logical read operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The full product list
    Products,
    /// A single product detail
    Product(u64),
    /// The category names
    Categories,
}

/// Key selector for prefix invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// Every entry
    All,
    /// The product list and every product detail
    Products,
    /// One product detail
    Product(u64),
    /// The category list
    Categories,
}

impl CacheKey {
    /// True when this key falls under the given scope
    pub fn in_scope(&self, scope: KeyScope) -> bool {
        match scope {
            KeyScope::All => true,
            KeyScope::Products => matches!(self, CacheKey::Products | CacheKey::Product(_)),
            KeyScope::Product(id) => matches!(self, CacheKey::Product(i) if *i == id),
            KeyScope::Categories => matches!(self, CacheKey::Categories),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Products => write!(f, "products"),
            CacheKey::Product(id) => write!(f, "product/{id}"),
            CacheKey::Categories => write!(f, "categories"),
        }
    }
}

/// Typed payload for each key kind
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    Categories(Vec<String>),
}

impl CacheValue {
    pub fn as_products(&self) -> Option<&[Product]> {
        match self {
            CacheValue::Products(products) => Some(products),
            _ => None,
        }
    }

    pub fn as_product(&self) -> Option<&Product> {
        match self {
            CacheValue::Product(product) => Some(product),
            _ => None,
        }
    }

    pub fn as_categories(&self) -> Option<&[String]> {
        match self {
            CacheValue::Categories(categories) => Some(categories),
            _ => None,
        }
    }
}

/// Lifecycle state of a cached read
///
/// Transitions: `Idle → Loading → {Success, Error}`, then back to `Loading`
/// on refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Cached result plus freshness metadata for one key
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Last successfully fetched (or optimistically written) value
    pub data: Option<CacheValue>,
    /// Timestamp of the last successful fetch; `None` until the first one
    /// succeeds, or after the entry was invalidated
    pub fetched_at: Option<Instant>,
    pub status: QueryStatus,
    /// Last error message when `status` is `Error`
    pub error: Option<String>,
    /// Age past which data is eligible for background refresh
    pub stale_after: Duration,
    /// Idle time after which the entry may be evicted
    pub expires_after: Duration,
    pub last_accessed: Instant,
}

impl CacheEntry {
    pub fn new(stale_after: Duration, expires_after: Duration) -> Self {
        Self {
            data: None,
            fetched_at: None,
            status: QueryStatus::Idle,
            error: None,
            stale_after,
            expires_after,
            last_accessed: Instant::now(),
        }
    }

    /// True when the data was fetched recently enough to serve without a
    /// network call
    pub fn is_fresh(&self, now: Instant) -> bool {
        match self.fetched_at {
            Some(fetched_at) => now.saturating_duration_since(fetched_at) < self.stale_after,
            None => false,
        }
    }

    /// Freshness check honoring both the entry's window and a read-supplied
    /// `stale_time` (whichever elapses first wins)
    pub fn is_fresh_within(&self, now: Instant, stale_time: Duration) -> bool {
        match self.fetched_at {
            Some(fetched_at) => {
                let age = now.saturating_duration_since(fetched_at);
                age < self.stale_after && age < stale_time
            }
            None => false,
        }
    }

    /// True when the entry has been unused longer than `expires_after`
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_accessed) >= self.expires_after
    }
}
