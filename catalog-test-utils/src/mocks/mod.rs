//! Mock implementations for testing

mod catalog;

pub use catalog::{Gate, MockCatalogApi, Op};
