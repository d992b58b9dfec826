//! Product model. Stock is never stored here; it is folded from the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub minimum_stock: i64,
    pub category_id: i64,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a new product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub minimum_stock: i64,
    pub category_id: i64,
}

/// Request body for updating an existing product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub minimum_stock: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Highest accepted unit price.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Highest accepted minimum stock.
pub const MAX_MINIMUM_STOCK: i64 = i32::MAX as i64;

/// Field constraints shared by create and update.
pub fn validate_product_fields(
    name: &str,
    price: &Decimal,
    minimum_stock: i64,
) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Product name is required".to_string());
    }
    if *price < Decimal::ZERO {
        return Err("Price must not be negative".to_string());
    }
    if *price > MAX_PRICE {
        return Err(format!("Price must be at most {}", MAX_PRICE));
    }
    if minimum_stock < 0 {
        return Err("Minimum stock must not be negative".to_string());
    }
    if minimum_stock > MAX_MINIMUM_STOCK {
        return Err(format!("Minimum stock must be at most {}", MAX_MINIMUM_STOCK));
    }
    Ok(())
}

/// Autocomplete hit for the product quick search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearchResult {
    pub id: i64,
    pub name: String,
    pub display_text: String,
    pub category_id: i64,
}

impl ProductSearchResult {
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            display_text: format!("{} (ID: {})", product.name, product.id),
            category_id: product.category_id,
        }
    }
}

/// Product entry for pickers, labelled with its full category path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductOption {
    pub id: i64,
    pub full_name: String,
}
