//! Dashboard reductions over the ledger and the materialized product views.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::hierarchy::CategoryTree;
use super::ledger::{is_cancelled, out_of_range, StockStatus};
use super::view::ProductView;
use crate::errors::AppError;
use crate::models::StockMovement;

/// Number of path segments shown next to dashboard entries.
pub const DASHBOARD_PATH_DEPTH: usize = 2;

/// Length of the low-stock list.
pub const LOW_STOCK_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: i64,
    pub product_name: String,
    pub total_sold: i64,
    pub category_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub product_id: i64,
    pub product_name: String,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub status: StockStatus,
    pub category_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_products: usize,
    pub total_categories: usize,
    pub total_movements: usize,
    pub critical_stock_count: usize,
    pub low_stock_count: usize,
    pub total_sales_value: Decimal,
    pub total_stock_value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub top_selling: Vec<ProductSales>,
    pub low_stock: Vec<LowStockProduct>,
    pub summary: DashboardSummary,
}

/// Outbound movements that count as sales: negative and not cancelled.
fn sales(movements: &[StockMovement]) -> impl Iterator<Item = &StockMovement> {
    movements
        .iter()
        .filter(|m| m.quantity < 0 && !is_cancelled(m.note.as_deref()))
}

/// Units sold by one sale movement.
fn units_sold(movement: &StockMovement) -> Result<i64, AppError> {
    movement
        .quantity
        .checked_neg()
        .ok_or_else(|| out_of_range("Units sold", movement.product_id))
}

/// Products ranked by units sold, highest first, ties by product id.
pub fn top_selling(
    movements: &[StockMovement],
    views: &[ProductView],
    tree: &CategoryTree,
    limit: usize,
) -> Result<Vec<ProductSales>, AppError> {
    let mut sold: HashMap<i64, i64> = HashMap::new();
    for movement in sales(movements) {
        let total = sold.entry(movement.product_id).or_insert(0);
        *total = total
            .checked_add(units_sold(movement)?)
            .ok_or_else(|| out_of_range("Units sold", movement.product_id))?;
    }

    let mut ranked: Vec<(&ProductView, i64)> = views
        .iter()
        .filter_map(|v| sold.get(&v.id).map(|&total| (v, total)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.id.cmp(&b.0.id)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(view, total_sold)| {
            Ok(ProductSales {
                product_id: view.id,
                product_name: view.name.clone(),
                total_sold,
                category_path: tree.short_path(view.category_id, DASHBOARD_PATH_DEPTH)?,
            })
        })
        .collect()
}

/// Products at or below their minimum (negative included), lowest stock first.
pub fn low_stock(
    views: &[ProductView],
    tree: &CategoryTree,
) -> Result<Vec<LowStockProduct>, AppError> {
    let mut flagged: Vec<&ProductView> = views
        .iter()
        .filter(|v| v.status.needs_restock())
        .collect();
    flagged.sort_by(|a, b| a.current_stock.cmp(&b.current_stock).then(a.id.cmp(&b.id)));

    flagged
        .into_iter()
        .take(LOW_STOCK_LIMIT)
        .map(|view| {
            Ok(LowStockProduct {
                product_id: view.id,
                product_name: view.name.clone(),
                current_stock: view.current_stock,
                minimum_stock: view.minimum_stock,
                status: view.status,
                category_path: tree.short_path(view.category_id, DASHBOARD_PATH_DEPTH)?,
            })
        })
        .collect()
}

/// Counters and money totals.
pub fn summary(
    movements: &[StockMovement],
    views: &[ProductView],
    total_categories: usize,
) -> Result<DashboardSummary, AppError> {
    let prices: HashMap<i64, Decimal> = views.iter().map(|v| (v.id, v.price)).collect();

    let mut total_sales_value = Decimal::ZERO;
    for movement in sales(movements) {
        let Some(price) = prices.get(&movement.product_id) else {
            continue;
        };
        total_sales_value = Decimal::from(units_sold(movement)?)
            .checked_mul(*price)
            .and_then(|value| total_sales_value.checked_add(value))
            .ok_or_else(|| out_of_range("Sales value", movement.product_id))?;
    }

    let mut total_stock_value = Decimal::ZERO;
    for view in views {
        total_stock_value = total_stock_value
            .checked_add(view.stock_value()?)
            .ok_or_else(|| out_of_range("Stock value", view.id))?;
    }

    Ok(DashboardSummary {
        total_products: views.len(),
        total_categories,
        total_movements: movements.len(),
        critical_stock_count: views
            .iter()
            .filter(|v| v.status == StockStatus::Critical)
            .count(),
        low_stock_count: views
            .iter()
            .filter(|v| v.status == StockStatus::Low)
            .count(),
        total_sales_value,
        total_stock_value,
    })
}

/// Everything the dashboard shows, from one consistent snapshot.
pub fn build(
    movements: &[StockMovement],
    views: &[ProductView],
    tree: &CategoryTree,
    top_limit: usize,
) -> Result<Dashboard, AppError> {
    Ok(Dashboard {
        top_selling: top_selling(movements, views, tree, top_limit)?,
        low_stock: low_stock(views, tree)?,
        summary: summary(movements, views, tree.len())?,
    })
}
