//! Flat product records joining product, category path and folded stock.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::hierarchy::{CategoryTree, PATH_SEPARATOR};
use super::ledger::{current_stock, out_of_range, stock_by_product, StockStatus};
use crate::errors::AppError;
use crate::models::{Product, StockMovement};

/// Derived product record. Rebuilt on every read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub category_id: i64,
    pub category_path: String,
    pub status: StockStatus,
}

impl ProductView {
    /// Category path followed by the product name.
    pub fn full_name(&self) -> String {
        if self.category_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}{}{}", self.category_path, PATH_SEPARATOR, self.name)
        }
    }

    /// Current stock valued at list price. Negative when oversold.
    pub fn stock_value(&self) -> Result<Decimal, AppError> {
        Decimal::from(self.current_stock)
            .checked_mul(self.price)
            .ok_or_else(|| out_of_range("Stock value", self.id))
    }
}

/// Build one view from a product, its resolved path and its ledger.
pub fn materialize(
    product: &Product,
    category_path: String,
    movements: &[StockMovement],
) -> Result<ProductView, AppError> {
    Ok(with_stock(product, category_path, current_stock(movements)?))
}

fn with_stock(product: &Product, category_path: String, stock: i64) -> ProductView {
    ProductView {
        id: product.id,
        name: product.name.clone(),
        price: product.price,
        current_stock: stock,
        minimum_stock: product.minimum_stock,
        category_id: product.category_id,
        category_path,
        status: StockStatus::classify(stock, product.minimum_stock),
    }
}

/// Build views for every product against one category snapshot.
///
/// Paths are resolved once per distinct category; the result is identical to
/// resolving each product on its own.
pub fn materialize_all(
    products: &[Product],
    movements: &[StockMovement],
    tree: &CategoryTree,
) -> Result<Vec<ProductView>, AppError> {
    let stock = stock_by_product(movements)?;
    let mut paths: HashMap<i64, String> = HashMap::new();
    let mut views = Vec::with_capacity(products.len());

    for product in products {
        let path = match paths.get(&product.category_id) {
            Some(path) => path.clone(),
            None => {
                let path = tree.resolve_path(product.category_id)?;
                paths.insert(product.category_id, path.clone());
                path
            }
        };
        let current = stock.get(&product.id).copied().unwrap_or(0);
        views.push(with_stock(product, path, current));
    }

    Ok(views)
}
