//! Mutation controller
//!
//! Performs update and delete against the remote service with optimistic
//! local effects and guaranteed rollback on failure:
//!
//! 1. cancel in-flight reads for every key the mutation touches, so a stale
//!    fetch resolution cannot clobber the optimistic write
//! 2. snapshot the touched entries into a [`MutationContext`]
//! 3. apply the mutation to the cache as if the network call had succeeded
//! 4. call the remote service
//! 5. on success overwrite with the confirmed server state and discard the
//!    context; on failure restore every entry from the snapshot
//!
//! Cache writes between the await points are synchronous, so each phase is
//! atomic under the run-to-completion model.

use crate::api::CatalogApi;
use crate::cache::{CacheKey, CacheStore, CacheValue, KeyScope};
use crate::error::Result;
use crate::product::{DeleteAck, Product, ProductPatch};
use log::{debug, warn};
use std::sync::Arc;

/// Mutation policy knobs
#[derive(Debug, Clone)]
pub struct MutationSettings {
    /// Schedule a list refetch after a successful commit.
    ///
    /// Off by default: with a backend that does not durably persist writes, a
    /// refetch would erase the user-visible change. Turn this on against a
    /// real persistent backend.
    pub refetch_after_commit: bool,
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self {
            refetch_after_commit: false,
        }
    }
}

/// Orchestrates optimistic writes against the cache store and the remote
/// service
pub struct MutationController {
    store: Arc<CacheStore>,
    api: Arc<dyn CatalogApi>,
    settings: MutationSettings,
}

impl MutationController {
    pub fn new(store: Arc<CacheStore>, api: Arc<dyn CatalogApi>) -> Self {
        Self::with_settings(store, api, MutationSettings::default())
    }

    pub fn with_settings(
        store: Arc<CacheStore>,
        api: Arc<dyn CatalogApi>,
        settings: MutationSettings,
    ) -> Self {
        Self {
            store,
            api,
            settings,
        }
    }

    /// Update a product with optimistic cache effects
    ///
    /// Returns the confirmed server state on success. On failure the cache is
    /// rolled back to its pre-mutation state before the error is surfaced.
    pub async fn update_product(&self, id: u64, patch: ProductPatch) -> Result<Product> {
        let keys = [CacheKey::Products, CacheKey::Product(id)];
        for key in &keys {
            self.store.cancel_in_flight(key);
        }
        let context = self.store.snapshot(&keys);

        apply_product_patch(&self.store, id, &patch);
        debug!("optimistically applied update for product {id}");

        match self.api.update_product(id, &patch).await {
            Ok(confirmed) => {
                commit_product_update(&self.store, &confirmed);
                if self.settings.refetch_after_commit {
                    self.store.invalidate(KeyScope::Products);
                }
                // Context dropped here: the snapshot is only for rollback.
                Ok(confirmed)
            }
            Err(error) => {
                warn!("update for product {id} failed, rolling back: {error}");
                self.store.restore(context);
                Err(error)
            }
        }
    }

    /// Delete a product with optimistic cache effects
    ///
    /// The product disappears from the cached list and its detail entry is
    /// dropped before the network call resolves; a failure restores both.
    pub async fn delete_product(&self, id: u64) -> Result<DeleteAck> {
        let keys = [CacheKey::Products, CacheKey::Product(id)];
        for key in &keys {
            self.store.cancel_in_flight(key);
        }
        let context = self.store.snapshot(&keys);

        apply_product_delete(&self.store, id);
        debug!("optimistically applied delete for product {id}");

        match self.api.delete_product(id).await {
            Ok(ack) => {
                // The optimistic state already matches the confirmed outcome:
                // the list no longer carries the product and the detail entry
                // is gone.
                if self.settings.refetch_after_commit {
                    self.store.invalidate(KeyScope::Products);
                }
                Ok(ack)
            }
            Err(error) => {
                warn!("delete for product {id} failed, rolling back: {error}");
                self.store.restore(context);
                Err(error)
            }
        }
    }
}

/// Merge a patch into every cached entry carrying the product
pub(crate) fn apply_product_patch(store: &CacheStore, id: u64, patch: &ProductPatch) {
    if let Some(entry) = store.peek(&CacheKey::Products)
        && let Some(CacheValue::Products(mut products)) = entry.data
        && let Some(slot) = products.iter_mut().find(|product| product.id == id)
    {
        patch.apply_to(slot);
        store.set(CacheKey::Products, CacheValue::Products(products));
    }
    if let Some(entry) = store.peek(&CacheKey::Product(id))
        && let Some(CacheValue::Product(mut product)) = entry.data
    {
        patch.apply_to(&mut product);
        store.set(CacheKey::Product(id), CacheValue::Product(product));
    }
}

/// Overwrite cached entries with the confirmed server state
pub(crate) fn commit_product_update(store: &CacheStore, confirmed: &Product) {
    if let Some(entry) = store.peek(&CacheKey::Products)
        && let Some(CacheValue::Products(mut products)) = entry.data
        && let Some(slot) = products.iter_mut().find(|product| product.id == confirmed.id)
    {
        *slot = confirmed.clone();
        store.set(CacheKey::Products, CacheValue::Products(products));
    }
    store.set(
        CacheKey::Product(confirmed.id),
        CacheValue::Product(Box::new(confirmed.clone())),
    );
}

/// Remove a product from the cached list and drop its detail entry
pub(crate) fn apply_product_delete(store: &CacheStore, id: u64) {
    if let Some(entry) = store.peek(&CacheKey::Products)
        && let Some(CacheValue::Products(mut products)) = entry.data
    {
        products.retain(|product| product.id != id);
        store.set(CacheKey::Products, CacheValue::Products(products));
    }
    store.remove(&CacheKey::Product(id));
}
