//! Product builders for tests

use catalog_client_core::product::{Product, Rating};

/// Fluent builder for test products
#[derive(Debug, Clone)]
pub struct ProductBuilder {
    product: Product,
}

impl ProductBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            product: Product {
                id,
                title: format!("Product {id}"),
                price: 10.0,
                description: format!("Description for product {id}"),
                category: "electronics".to_string(),
                image: format!("https://example.com/{id}.png"),
                rating: Rating {
                    rate: 4.0,
                    count: 100,
                },
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.product.title = title.to_string();
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.product.price = price;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.product.category = category.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.product.description = description.to_string();
        self
    }

    pub fn build(self) -> Product {
        self.product
    }
}

/// A list of `count` distinct products with sequential ids starting at 1
pub fn sample_products(count: usize) -> Vec<Product> {
    (1..=count as u64).map(|id| ProductBuilder::new(id).build()).collect()
}
