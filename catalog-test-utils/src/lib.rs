//! Test utilities for the catalog client
//!
//! This crate provides a mock remote catalog service and product builders for
//! testing the cache, query, and mutation layers without network access.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{ProductBuilder, sample_products};
pub use mocks::{Gate, MockCatalogApi, Op};
