//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Product
//! updates use a per-row version column; a lost race is retried once against
//! fresh data. Category updates hold the write lock from read to write, so the
//! subtree check and the move cannot interleave with another move.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::catalog::{AncestryWalk, CategoryTree};
use crate::errors::AppError;
use crate::models::{
    validate_product_fields, Category, CreateCategoryRequest, CreateMovementRequest,
    CreateProductRequest, Product, StockMovement, UpdateCategoryRequest, UpdateProductRequest,
};

/// Attempts made by an update before reporting a concurrent modification.
const UPDATE_ATTEMPTS: usize = 2;

/// Consistent read of the whole store, taken inside one transaction.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    pub movements: Vec<StockMovement>,
}

const CATEGORY_COLUMNS: &str = "SELECT id, name, parent_id, version FROM categories";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    /// Statements run between a product update's read and its conditional write.
    #[cfg(test)]
    interleaved: std::sync::Arc<std::sync::Mutex<std::collections::VecDeque<String>>>,
}

fn category_from_row(row: &SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        parent_id: row.get("parent_id"),
        version: row.get("version"),
    }
}

fn product_from_row(row: &SqliteRow) -> Result<Product, AppError> {
    let raw_price: String = row.get("price");
    let price = Decimal::from_str(&raw_price)
        .map_err(|e| AppError::Database(format!("Invalid stored price '{}': {}", raw_price, e)))?;
    Ok(Product {
        id: row.get("id"),
        name: row.get("name"),
        price,
        minimum_stock: row.get("minimum_stock"),
        category_id: row.get("category_id"),
        version: row.get("version"),
    })
}

fn movement_from_row(row: &SqliteRow) -> Result<StockMovement, AppError> {
    let raw_date: String = row.get("date");
    let date = DateTime::parse_from_rfc3339(&raw_date)
        .map_err(|e| AppError::Database(format!("Invalid stored date '{}': {}", raw_date, e)))?
        .with_timezone(&Utc);
    Ok(StockMovement {
        id: row.get("id"),
        product_id: row.get("product_id"),
        date,
        quantity: row.get("quantity"),
        note: row.get("note"),
    })
}

fn version_mismatch(expected: i64, current: i64) -> AppError {
    AppError::ConcurrentModification {
        message: format!(
            "Version mismatch: expected {}, current {}",
            expected, current
        ),
        current_version: current,
    }
}

/// Reject moves under a missing parent or into the category's own subtree.
async fn check_reparent(
    conn: &mut SqliteConnection,
    id: i64,
    new_parent: i64,
) -> Result<(), AppError> {
    let categories: Vec<Category> = sqlx::query(CATEGORY_COLUMNS)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(category_from_row)
        .collect();
    let tree = CategoryTree::new(categories);
    if tree.get(new_parent).is_none() {
        return Err(AppError::NotFound(format!(
            "Parent category {} not found",
            new_parent
        )));
    }
    if tree.subtree_ids(id)?.contains(&new_parent) {
        return Err(AppError::Validation(
            "A category cannot be moved under itself or its descendants".to_string(),
        ));
    }
    Ok(())
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            #[cfg(test)]
            interleaved: Default::default(),
        }
    }

    #[cfg(test)]
    fn interleave_next(&self, sql: &str) {
        self.interleaved
            .lock()
            .expect("interleave queue poisoned")
            .push_back(sql.to_string());
    }

    #[cfg(test)]
    async fn interleave(&self) -> Result<(), AppError> {
        let next = self
            .interleaved
            .lock()
            .expect("interleave queue poisoned")
            .pop_front();
        if let Some(sql) = next {
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    #[cfg(not(test))]
    async fn interleave(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// Read every category, product and movement from one transaction.
    pub async fn snapshot(&self) -> Result<Snapshot, AppError> {
        let mut tx = self.pool.begin().await?;

        let categories: Vec<Category> =
            sqlx::query(&format!("{} ORDER BY id", CATEGORY_COLUMNS))
                .fetch_all(&mut *tx)
                .await?
                .iter()
                .map(category_from_row)
                .collect();

        let products = sqlx::query(
            "SELECT id, name, price, minimum_stock, category_id, version FROM products ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(product_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        let movements = sqlx::query(
            "SELECT id, product_id, date, quantity, note FROM stock_movements ORDER BY id",
        )
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(movement_from_row)
        .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;

        Ok(Snapshot {
            categories,
            products,
            movements,
        })
    }

    // ---------------------------------------------------------------------
    // Categories
    // ---------------------------------------------------------------------

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query("SELECT id, name, parent_id, version FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        let row = sqlx::query("SELECT id, name, parent_id, version FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(category_from_row))
    }

    /// Resolve a category path by loading one ancestor at a time.
    ///
    /// Each call keeps its own visited set; nothing is cached between calls.
    pub async fn resolve_path(&self, id: i64) -> Result<String, AppError> {
        let category = self
            .get_category(id)
            .await?
            .ok_or_else(|| AppError::not_found("Category", id))?;

        let mut walk = AncestryWalk::start(&category);
        while let Some(parent_id) = walk.pending_parent() {
            let parent = self.get_category(parent_id).await?;
            walk.advance(parent.as_ref())?;
        }
        Ok(walk.into_path())
    }

    /// Create a new category under an existing parent.
    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category name is required".to_string()));
        }
        if self.get_category(request.parent_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Parent category {} not found",
                request.parent_id
            )));
        }

        let result = sqlx::query("INSERT INTO categories (name, parent_id, version) VALUES (?, ?, 1)")
            .bind(name)
            .bind(request.parent_id)
            .execute(&self.pool)
            .await?;

        let category = Category {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            parent_id: Some(request.parent_id),
            version: 1,
        };
        tracing::info!("Created category {} '{}'", category.id, category.name);
        Ok(category)
    }

    /// Rename or move a category.
    ///
    /// Runs under `BEGIN IMMEDIATE`: the subtree check sees the tree exactly
    /// as the update leaves it, so two crossing moves cannot form a cycle.
    pub async fn update_category(
        &self,
        id: i64,
        request: &UpdateCategoryRequest,
    ) -> Result<Category, AppError> {
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let existing = sqlx::query(&format!("{} WHERE id = ?", CATEGORY_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .as_ref()
            .map(category_from_row)
            .ok_or_else(|| AppError::not_found("Category", id))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(version_mismatch(expected, existing.version));
            }
        }

        let name = match &request.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::Validation("Category name is required".to_string()));
            }
            Some(name) => name.trim().to_string(),
            None => existing.name.clone(),
        };

        let parent_id = match request.parent_id {
            None => existing.parent_id,
            Some(_) if existing.is_root() => {
                return Err(AppError::Validation(
                    "The root category cannot be moved".to_string(),
                ));
            }
            Some(new_parent) => {
                check_reparent(&mut *tx, id, new_parent).await?;
                Some(new_parent)
            }
        };

        let new_version = existing.version + 1;

        let result = sqlx::query(
            "UPDATE categories SET name = ?, parent_id = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&name)
        .bind(parent_id)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(AppError::ConcurrentModification {
                message: "Concurrent modification detected".to_string(),
                current_version: existing.version,
            });
        }

        tx.commit().await?;

        tracing::info!("Updated category {} to version {}", id, new_version);
        Ok(Category {
            id,
            name,
            parent_id,
            version: new_version,
        })
    }

    /// Delete a category together with its products and their movements.
    ///
    /// Refused while subcategories exist.
    pub async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT parent_id FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Category", id))?;
        let parent_id: Option<i64> = row.get("parent_id");
        if parent_id.is_none() {
            return Err(AppError::Validation(
                "The root category cannot be deleted".to_string(),
            ));
        }

        let children: i64 = sqlx::query("SELECT COUNT(*) AS n FROM categories WHERE parent_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?
            .get("n");
        if children > 0 {
            tracing::warn!("Refusing to delete category {} with {} subcategories", id, children);
            return Err(AppError::HasSubcategories(id));
        }

        // Products and their movements go with the category through ON DELETE CASCADE.
        let removed_products: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM products WHERE category_id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?
                .get("n");

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Deleted category {} and {} products",
            id,
            removed_products
        );
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Products
    // ---------------------------------------------------------------------

    /// List all products.
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, price, minimum_stock, category_id, version FROM products ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(product_from_row).collect()
    }

    /// Get a product by ID.
    pub async fn get_product(&self, id: i64) -> Result<Option<Product>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, price, minimum_stock, category_id, version FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    /// Create a new product in an existing category.
    pub async fn create_product(&self, request: &CreateProductRequest) -> Result<Product, AppError> {
        validate_product_fields(&request.name, &request.price, request.minimum_stock)
            .map_err(AppError::Validation)?;
        if self.get_category(request.category_id).await?.is_none() {
            return Err(AppError::not_found("Category", request.category_id));
        }

        let name = request.name.trim().to_string();
        let result = sqlx::query(
            "INSERT INTO products (name, price, minimum_stock, category_id, version) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(&name)
        .bind(request.price.to_string())
        .bind(request.minimum_stock)
        .bind(request.category_id)
        .execute(&self.pool)
        .await?;

        let product = Product {
            id: result.last_insert_rowid(),
            name,
            price: request.price,
            minimum_stock: request.minimum_stock,
            category_id: request.category_id,
            version: 1,
        };
        tracing::info!("Created product {} '{}'", product.id, product.name);
        Ok(product)
    }

    /// Update an existing product.
    pub async fn update_product(
        &self,
        id: i64,
        request: &UpdateProductRequest,
    ) -> Result<Product, AppError> {
        for attempt in 1..=UPDATE_ATTEMPTS {
            let existing = self
                .get_product(id)
                .await?
                .ok_or_else(|| AppError::not_found("Product", id))?;

            // Check version for optimistic concurrency
            if let Some(expected) = request.expected_version {
                if existing.version != expected {
                    return Err(version_mismatch(expected, existing.version));
                }
            }

            let name = request
                .name
                .as_deref()
                .map(str::trim)
                .unwrap_or(existing.name.as_str())
                .to_string();
            let price = request.price.unwrap_or(existing.price);
            let minimum_stock = request.minimum_stock.unwrap_or(existing.minimum_stock);
            let category_id = request.category_id.unwrap_or(existing.category_id);

            validate_product_fields(&name, &price, minimum_stock).map_err(AppError::Validation)?;
            if category_id != existing.category_id
                && self.get_category(category_id).await?.is_none()
            {
                return Err(AppError::not_found("Category", category_id));
            }

            let new_version = existing.version + 1;

            self.interleave().await?;

            let result = sqlx::query(
                "UPDATE products SET name = ?, price = ?, minimum_stock = ?, category_id = ?, version = ? WHERE id = ? AND version = ?",
            )
            .bind(&name)
            .bind(price.to_string())
            .bind(minimum_stock)
            .bind(category_id)
            .bind(new_version)
            .bind(id)
            .bind(existing.version)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 1 {
                return Ok(Product {
                    id,
                    name,
                    price,
                    minimum_stock,
                    category_id,
                    version: new_version,
                });
            }

            tracing::warn!(
                "Product {} changed during update (attempt {}/{})",
                id,
                attempt,
                UPDATE_ATTEMPTS
            );
        }

        let current = self.get_product(id).await?;
        match current {
            None => Err(AppError::not_found("Product", id)),
            Some(p) => Err(AppError::ConcurrentModification {
                message: "Concurrent modification detected".to_string(),
                current_version: p.version,
            }),
        }
    }

    /// Delete a product and its movements.
    pub async fn delete_product(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Product", id));
        }

        tracing::info!("Deleted product {}", id);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Stock movements
    // ---------------------------------------------------------------------

    /// Ledger of one product, oldest first.
    pub async fn list_product_movements(
        &self,
        product_id: i64,
    ) -> Result<Vec<StockMovement>, AppError> {
        let rows = sqlx::query(
            "SELECT id, product_id, date, quantity, note FROM stock_movements WHERE product_id = ? ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(movement_from_row).collect()
    }

    /// Append a movement dated now. There is no update or delete counterpart.
    pub async fn add_movement(
        &self,
        product_id: i64,
        request: &CreateMovementRequest,
    ) -> Result<StockMovement, AppError> {
        let note = request.validated_note().map_err(AppError::Validation)?;
        if self.get_product(product_id).await?.is_none() {
            return Err(AppError::not_found("Product", product_id));
        }

        let date = Utc::now();
        let result = sqlx::query(
            "INSERT INTO stock_movements (product_id, date, quantity, note) VALUES (?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(date.to_rfc3339())
        .bind(request.quantity)
        .bind(&note)
        .execute(&self.pool)
        .await?;

        let movement = StockMovement {
            id: result.last_insert_rowid(),
            product_id,
            date,
            quantity: request.quantity,
            note,
        };
        tracing::info!(
            "Recorded movement {} on product {}: {:+}",
            movement.id,
            product_id,
            movement.quantity
        );
        Ok(movement)
    }
}
