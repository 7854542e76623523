//! Product data model
//!
//! The remote service owns the authoritative product records; the cache holds
//! copies. `ProductPatch` carries the fields an edit may change and doubles as
//! the PUT request body and the optimistic merge source.

use serde::{Deserialize, Serialize};

/// A catalog product as served by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    /// Image URI
    pub image: String,
    #[serde(default)]
    pub rating: Rating,
}

/// Aggregate customer rating
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub rate: f64,
    pub count: u64,
}

/// Partial product for update mutations
///
/// Absent fields are left untouched, both in the request body and when the
/// patch is merged optimistically into cached entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Acknowledgement body returned by a delete request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAck {
    pub id: u64,
}

impl ProductPatch {
    /// True when the patch carries no changes
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.category.is_none()
    }

    /// Basic field checks before a mutation is attempted
    ///
    /// Returns a human-readable reason when the patch must be rejected:
    /// empty title or non-positive price.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(title) = &self.title
            && title.trim().is_empty()
        {
            return Err("title must not be empty".to_string());
        }
        if let Some(price) = self.price
            && !(price > 0.0)
        {
            return Err("price must be a positive number".to_string());
        }
        Ok(())
    }

    /// Merge the patch into a product, leaving absent fields untouched
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(title) = &self.title {
            product.title = title.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        Product {
            id: 1,
            title: "Backpack".to_string(),
            price: 109.95,
            description: "Fits 15-inch laptops".to_string(),
            category: "men's clothing".to_string(),
            image: "https://example.com/1.png".to_string(),
            rating: Rating {
                rate: 3.9,
                count: 120,
            },
        }
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut product = sample();
        let patch = ProductPatch {
            price: Some(15.0),
            ..Default::default()
        };
        patch.apply_to(&mut product);
        assert_eq!(product.price, 15.0);
        assert_eq!(product.title, "Backpack");
    }

    #[test]
    fn patch_rejects_non_positive_price() {
        let patch = ProductPatch {
            price: Some(0.0),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = ProductPatch {
            price: Some(f64::NAN),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn patch_rejects_blank_title() {
        let patch = ProductPatch {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn patch_serializes_without_absent_fields() {
        let patch = ProductPatch {
            title: Some("B".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_string(&patch).unwrap();
        assert_eq!(body, r#"{"title":"B"}"#);
    }

    #[test]
    fn product_deserializes_without_rating() {
        let raw = r#"{"id":7,"title":"Ring","price":9.99,"description":"","category":"jewelery","image":"u"}"#;
        let product: Product = serde_json::from_str(raw).unwrap();
        assert_eq!(product.rating.count, 0);
    }
}
