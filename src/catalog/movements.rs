//! Movement history joined with product and category information.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::hierarchy::CategoryTree;
use crate::errors::AppError;
use crate::models::{Product, StockMovement};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Inbound,
    Outbound,
}

impl MovementKind {
    pub fn of(quantity: i64) -> Self {
        if quantity >= 0 {
            MovementKind::Inbound
        } else {
            MovementKind::Outbound
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MovementView {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub category_path: String,
    pub quantity: i64,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub kind: MovementKind,
}

/// History filters. Date bounds are inclusive calendar days (UTC).
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product_id: Option<i64>,
    pub product_search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl MovementFilter {
    fn accepts(&self, movement: &StockMovement, product: &Product) -> bool {
        let day = movement.date.date_naive();
        self.product_id.map_or(true, |id| movement.product_id == id)
            && self.from.map_or(true, |from| day >= from)
            && self.to.map_or(true, |to| day <= to)
            && self
                .product_search
                .as_deref()
                .map(str::trim)
                .filter(|term| !term.is_empty())
                .map_or(true, |term| {
                    product.name.to_lowercase().contains(&term.to_lowercase())
                })
    }
}

/// Filtered history, newest first. Movements whose product is gone are skipped.
pub fn history(
    movements: Vec<StockMovement>,
    products: &[Product],
    tree: &CategoryTree,
    filter: &MovementFilter,
) -> Result<Vec<MovementView>, AppError> {
    let by_id: HashMap<i64, &Product> = products.iter().map(|p| (p.id, p)).collect();
    let mut paths: HashMap<i64, String> = HashMap::new();
    let mut views = Vec::new();

    for movement in movements {
        let Some(product) = by_id.get(&movement.product_id) else {
            continue;
        };
        if !filter.accepts(&movement, product) {
            continue;
        }
        let path = match paths.get(&product.category_id) {
            Some(path) => path.clone(),
            None => {
                let path = tree.resolve_path(product.category_id)?;
                paths.insert(product.category_id, path.clone());
                path
            }
        };
        views.push(MovementView {
            id: movement.id,
            product_id: movement.product_id,
            product_name: product.name.clone(),
            category_path: path,
            quantity: movement.quantity,
            date: movement.date,
            note: movement.note,
            kind: MovementKind::of(movement.quantity),
        });
    }

    views.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    Ok(views)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::Category;

    fn fixtures() -> (CategoryTree, Vec<Product>, Vec<StockMovement>) {
        let tree = CategoryTree::new(vec![
            Category {
                id: 1,
                name: "Products".to_string(),
                parent_id: None,
                version: 1,
            },
            Category {
                id: 2,
                name: "Drinks".to_string(),
                parent_id: Some(1),
                version: 1,
            },
        ]);
        let products = vec![
            Product {
                id: 10,
                name: "Cola".to_string(),
                price: Decimal::ONE,
                minimum_stock: 0,
                category_id: 2,
                version: 1,
            },
            Product {
                id: 11,
                name: "Water".to_string(),
                price: Decimal::ONE,
                minimum_stock: 0,
                category_id: 2,
                version: 1,
            },
        ];
        let at = |day: u32, hour: u32| Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap();
        let movements = vec![
            StockMovement {
                id: 1,
                product_id: 10,
                date: at(1, 9),
                quantity: 20,
                note: None,
            },
            StockMovement {
                id: 2,
                product_id: 11,
                date: at(2, 23),
                quantity: 5,
                note: None,
            },
            StockMovement {
                id: 3,
                product_id: 10,
                date: at(3, 12),
                quantity: -4,
                note: Some("sale".to_string()),
            },
        ];
        (tree, products, movements)
    }

    #[test]
    fn test_history_is_newest_first_with_kinds() {
        let (tree, products, movements) = fixtures();
        let views = history(movements, &products, &tree, &MovementFilter::default()).unwrap();

        let ids: Vec<i64> = views.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(views[0].kind, MovementKind::Outbound);
        assert_eq!(views[1].kind, MovementKind::Inbound);
        assert_eq!(views[0].category_path, "Drinks");
        assert_eq!(views[0].product_name, "Cola");
    }

    #[test]
    fn test_history_filters() {
        let (tree, products, movements) = fixtures();

        let by_product = MovementFilter {
            product_id: Some(10),
            ..Default::default()
        };
        let views = history(movements.clone(), &products, &tree, &by_product).unwrap();
        assert_eq!(views.len(), 2);

        let by_name = MovementFilter {
            product_search: Some("wat".to_string()),
            ..Default::default()
        };
        let views = history(movements.clone(), &products, &tree, &by_name).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].product_id, 11);

        let by_days = MovementFilter {
            from: NaiveDate::from_ymd_opt(2025, 3, 2),
            to: NaiveDate::from_ymd_opt(2025, 3, 2),
            ..Default::default()
        };
        let views = history(movements, &products, &tree, &by_days).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, 2);
    }
}
