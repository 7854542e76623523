//! Catalog Client Core Library
//!
//! Client-side data synchronization for a remote product catalog: an
//! in-memory cache store with freshness metadata, a query controller with
//! stale-while-revalidate reads and request coalescing, a mutation controller
//! with optimistic updates and rollback, and a focus-driven revalidation
//! trigger.
//!
//! All state lives in the process; nothing is persisted except the session
//! flag. The store is created explicitly at startup and shared by `Arc` with
//! the controllers and the front end.

pub mod api;
pub mod cache;
pub mod error;
pub mod mutation;
pub mod product;
pub mod query;
pub mod revalidate;
pub mod session;

// Re-export main types
pub use api::{ApiConfig, CatalogApi, HttpCatalogApi};
pub use cache::{
    CacheEntry, CacheKey, CacheStats, CacheStore, CacheValue, KeyScope, MutationContext,
    QueryStatus, store::CachePolicy,
};
pub use error::{Error, Result};
pub use mutation::{MutationController, MutationSettings};
pub use product::{DeleteAck, Product, ProductPatch, Rating};
pub use query::{QueryController, QueryOptions, QuerySnapshot};
pub use revalidate::{FocusSignal, FocusSource, RevalidationTrigger};
pub use session::{Credentials, SessionStore};
