//! Product entity and its purchasable credit packages.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

/// A purchasable bundle of credits at a fixed price.
///
/// `price` is in major currency units, as stored in the product row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Number of credits granted by this package.
    pub credits: u32,
    /// Price in major currency units.
    pub price: f64,
}

/// A sellable product with an ordered list of credit packages.
///
/// Packages are persisted as raw JSON in the product row; parsing is
/// deferred to [`Product::packages`] so that malformed stored data
/// surfaces as an error at the point of use instead of poisoning every
/// read of the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product row id.
    pub id: ProductId,
    /// Product name; purchase flows locate their product by name.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// Raw packages column, expected to hold a JSON array of [`Package`].
    pub packages: serde_json::Value,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product from an already-typed package list.
    pub fn new(name: impl Into<String>, description: Option<String>, packages: Vec<Package>) -> Self {
        Self {
            id: ProductId::new(),
            name: name.into(),
            description,
            // Vec<Package> serialization cannot fail
            packages: serde_json::to_value(packages).unwrap_or(serde_json::Value::Null),
            created_at: Utc::now(),
        }
    }

    /// Parses the stored packages column.
    ///
    /// A sellable product must have a non-empty array here; callers treat
    /// a parse failure as server-side misconfiguration.
    pub fn packages(&self) -> Result<Vec<Package>, serde_json::Error> {
        // Some legacy rows store the array as a JSON-encoded string.
        if let serde_json::Value::String(raw) = &self.packages {
            return serde_json::from_str(raw);
        }
        serde_json::from_value(self.packages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packages_parse_from_array() {
        let product = Product::new(
            "barcode",
            None,
            vec![
                Package {
                    credits: 10,
                    price: 5.0,
                },
                Package {
                    credits: 50,
                    price: 20.0,
                },
            ],
        );

        let packages = product.packages().unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[1].credits, 50);
    }

    #[test]
    fn packages_parse_from_json_encoded_string() {
        let mut product = Product::new("barcode", None, vec![]);
        product.packages =
            serde_json::Value::String(r#"[{"credits":10,"price":5.0}]"#.to_string());

        let packages = product.packages().unwrap();
        assert_eq!(packages[0].credits, 10);
    }

    #[test]
    fn malformed_packages_fail_to_parse() {
        let mut product = Product::new("barcode", None, vec![]);
        product.packages = serde_json::json!({"credits": "not-an-array"});

        assert!(product.packages().is_err());
    }
}
