//! Stock ledger folding and stock status classification.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::StockMovement;

/// Note marking an outbound movement as a reversed sale.
pub const CANCELLED_NOTE: &str = "cancelled";

/// Error for a derived total that no longer fits its type.
pub fn out_of_range(what: &str, product_id: i64) -> AppError {
    AppError::Internal(format!("{} of product {} is out of range", what, product_id))
}

/// Signed sum of every movement. Notes never exclude anything at this level.
pub fn current_stock<'a, I>(movements: I) -> Result<i64, AppError>
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    movements.into_iter().try_fold(0i64, |total, m| {
        total
            .checked_add(m.quantity)
            .ok_or_else(|| out_of_range("Stock", m.product_id))
    })
}

/// Current stock of every product that has at least one movement.
pub fn stock_by_product(movements: &[StockMovement]) -> Result<HashMap<i64, i64>, AppError> {
    let mut totals: HashMap<i64, i64> = HashMap::new();
    for movement in movements {
        let total = totals.entry(movement.product_id).or_insert(0);
        *total = total
            .checked_add(movement.quantity)
            .ok_or_else(|| out_of_range("Stock", movement.product_id))?;
    }
    Ok(totals)
}

/// Whether a movement's note marks it as cancelled.
pub fn is_cancelled(note: Option<&str>) -> bool {
    note.is_some_and(|n| n.trim().to_lowercase() == CANCELLED_NOTE)
}

/// Stock health relative to the product's minimum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Normal,
    Low,
    Critical,
}

impl StockStatus {
    /// Critical below zero, Low from zero up to and including the minimum.
    pub fn classify(current_stock: i64, minimum_stock: i64) -> Self {
        if current_stock < 0 {
            StockStatus::Critical
        } else if current_stock <= minimum_stock {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }

    /// Low or Critical.
    pub fn needs_restock(&self) -> bool {
        !matches!(self, StockStatus::Normal)
    }
}
