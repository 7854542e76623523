//! Mock implementation of the remote catalog service
//!
//! Provides configurable behavior for every `CatalogApi` operation: scripted
//! product data, per-operation call counters, failure injection, and response
//! gates that hold an operation open until the test releases it. Gates make
//! interleaving deterministic, which the coalescing and mutation-ordering
//! tests depend on.

use async_trait::async_trait;
use catalog_client_core::api::CatalogApi;
use catalog_client_core::error::{Error, Result};
use catalog_client_core::product::{DeleteAck, Product, ProductPatch};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;

/// One remote operation, for counters, gates, and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Get,
    Update,
    Delete,
    Categories,
}

/// Handle that releases a held operation
///
/// Dropping the gate without opening it also releases the operation, so a
/// failed test does not hang.
pub struct Gate {
    sender: watch::Sender<bool>,
}

impl Gate {
    /// Let held calls proceed
    pub fn open(&self) {
        let _ = self.sender.send(true);
    }
}

#[derive(Default)]
struct MockState {
    products: Vec<Product>,
    categories: Vec<String>,
    failures: HashMap<Op, String>,
    counts: HashMap<Op, usize>,
    gates: HashMap<Op, watch::Receiver<bool>>,
}

/// Mock catalog service backed by in-memory data
///
/// The mock owns its "server-side" product list; update and delete mutate it
/// and respond with confirmed state the way the real service does.
pub struct MockCatalogApi {
    state: Mutex<MockState>,
}

impl MockCatalogApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        let mock = Self::new();
        mock.set_products(products);
        mock
    }

    /// Replace the server-side product list
    pub fn set_products(&self, products: Vec<Product>) {
        self.state.lock().unwrap().products = products;
    }

    /// Replace the server-side category list
    pub fn set_categories(&self, categories: Vec<String>) {
        self.state.lock().unwrap().categories = categories;
    }

    /// Current server-side product list
    pub fn products(&self) -> Vec<Product> {
        self.state.lock().unwrap().products.clone()
    }

    /// Make an operation fail with the given message
    pub fn fail(&self, op: Op, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op, message.to_string());
    }

    /// Clear all injected failures
    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Hold responses for an operation until the returned gate is opened
    ///
    /// Calls still count as started while held.
    pub fn hold(&self, op: Op) -> Gate {
        let (sender, receiver) = watch::channel(false);
        self.state.lock().unwrap().gates.insert(op, receiver);
        Gate { sender }
    }

    /// Number of calls made to an operation
    pub fn calls(&self, op: Op) -> usize {
        self.state
            .lock()
            .unwrap()
            .counts
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    fn record_call(&self, op: Op) {
        *self.state.lock().unwrap().counts.entry(op).or_insert(0) += 1;
    }

    async fn pass_gate(&self, op: Op) {
        let receiver = self.state.lock().unwrap().gates.get(&op).cloned();
        if let Some(mut receiver) = receiver {
            while !*receiver.borrow() {
                // A dropped gate counts as open.
                if receiver.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    fn check_failure(&self, op: Op) -> Result<()> {
        match self.state.lock().unwrap().failures.get(&op) {
            Some(message) => Err(Error::Network(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockCatalogApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogApi for MockCatalogApi {
    async fn list_products(&self) -> Result<Vec<Product>> {
        self.record_call(Op::List);
        // Snapshot before the gate: a held response carries the server state
        // from when the request started, like a slow network response.
        let response = self.products();
        self.pass_gate(Op::List).await;
        self.check_failure(Op::List)?;
        Ok(response)
    }

    async fn get_product(&self, id: u64) -> Result<Product> {
        self.record_call(Op::Get);
        let response = self
            .state
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|product| product.id == id)
            .cloned();
        self.pass_gate(Op::Get).await;
        self.check_failure(Op::Get)?;
        response.ok_or_else(|| Error::Network(format!("product {id} not found")))
    }

    async fn update_product(&self, id: u64, patch: &ProductPatch) -> Result<Product> {
        self.record_call(Op::Update);
        self.pass_gate(Op::Update).await;
        self.check_failure(Op::Update)?;
        let mut state = self.state.lock().unwrap();
        let product = state
            .products
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| Error::Network(format!("product {id} not found")))?;
        patch.apply_to(product);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: u64) -> Result<DeleteAck> {
        self.record_call(Op::Delete);
        self.pass_gate(Op::Delete).await;
        self.check_failure(Op::Delete)?;
        let mut state = self.state.lock().unwrap();
        let before = state.products.len();
        state.products.retain(|product| product.id != id);
        if state.products.len() == before {
            return Err(Error::Network(format!("product {id} not found")));
        }
        Ok(DeleteAck { id })
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        self.record_call(Op::Categories);
        let response = self.state.lock().unwrap().categories.clone();
        self.pass_gate(Op::Categories).await;
        self.check_failure(Op::Categories)?;
        Ok(response)
    }
}
