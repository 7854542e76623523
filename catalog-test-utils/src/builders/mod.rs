//! Builders for test product data

mod test_data;

pub use test_data::{ProductBuilder, sample_products};
