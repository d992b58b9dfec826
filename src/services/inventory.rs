//! Inventory service: the operations exposed to the HTTP layer.
//!
//! Every call reads its own snapshot from the store and derives views from
//! it. Nothing derived is kept between calls.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::{
    self, dashboard, listing, movements, CategoryTree, Dashboard, DashboardSummary,
    MovementFilter, MovementView, Page, PageRequest, ProductFilter, ProductView, SortKey,
    SortOrder,
};
use crate::config::Config;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    CategoryOption, CreateMovementRequest, ProductOption, ProductSearchResult, StockMovement,
};

/// Maximum number of quick-search hits.
pub const QUICK_SEARCH_LIMIT: usize = 10;

/// Paging limits taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub top_selling: usize,
}

impl From<&Config> for Limits {
    fn from(config: &Config) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            top_selling: config.top_selling,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits::from(&Config::default())
    }
}

#[derive(Clone)]
pub struct InventoryService {
    repo: Arc<Repository>,
    limits: Limits,
}

impl InventoryService {
    pub fn new(repo: Arc<Repository>, limits: Limits) -> Self {
        Self { repo, limits }
    }

    fn page_request(&self, page: Option<usize>, page_size: Option<usize>) -> PageRequest {
        PageRequest::new(
            page.unwrap_or(1),
            page_size.unwrap_or(self.limits.default_page_size),
            self.limits.max_page_size,
        )
    }

    async fn tree(&self) -> Result<CategoryTree, AppError> {
        Ok(CategoryTree::new(self.repo.list_categories().await?))
    }

    /// Display path of one category, loading ancestors on demand.
    pub async fn resolve_path(&self, category_id: i64) -> Result<String, AppError> {
        self.repo.resolve_path(category_id).await
    }

    /// The category and all of its descendants.
    pub async fn subtree_ids(&self, category_id: i64) -> Result<BTreeSet<i64>, AppError> {
        self.tree().await?.subtree_ids(category_id)
    }

    /// Every category with its path, ordered by path.
    pub async fn category_options(&self) -> Result<Vec<CategoryOption>, AppError> {
        let tree = self.tree().await?;
        let mut options = tree
            .categories()
            .map(|c| {
                Ok(CategoryOption {
                    id: c.id,
                    path: tree.resolve_path(c.id)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        options.sort_by(|a, b| a.path.cmp(&b.path).then(a.id.cmp(&b.id)));
        Ok(options)
    }

    /// Single product view.
    pub async fn product_view(&self, product_id: i64) -> Result<ProductView, AppError> {
        let product = self
            .repo
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))?;
        let ledger = self.repo.list_product_movements(product_id).await?;
        let path = self.repo.resolve_path(product.category_id).await?;
        catalog::materialize(&product, path, &ledger)
    }

    /// Filtered, sorted page of product views.
    pub async fn list_product_views(
        &self,
        filter: &ProductFilter,
        key: SortKey,
        order: SortOrder,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> Result<Page<ProductView>, AppError> {
        let snapshot = self.repo.snapshot().await?;
        let tree = CategoryTree::new(snapshot.categories);
        let views = catalog::materialize_all(&snapshot.products, &snapshot.movements, &tree)?;
        listing::list(
            views,
            &tree,
            filter,
            key,
            order,
            self.page_request(page, page_size),
        )
    }

    /// Products labelled with their full path, ordered by name.
    pub async fn product_options(&self) -> Result<Vec<ProductOption>, AppError> {
        let snapshot = self.repo.snapshot().await?;
        let tree = CategoryTree::new(snapshot.categories);
        let mut views = catalog::materialize_all(&snapshot.products, &snapshot.movements, &tree)?;
        listing::sort_views(&mut views, SortKey::Name, SortOrder::Asc);
        Ok(views
            .iter()
            .map(|v| ProductOption {
                id: v.id,
                full_name: v.full_name(),
            })
            .collect())
    }

    /// Autocomplete by name or id. A blank term yields nothing.
    pub async fn search_products(&self, term: &str) -> Result<Vec<ProductSearchResult>, AppError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let lowered = term.to_lowercase();
        let products = self.repo.list_products().await?;
        Ok(products
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&lowered) || p.id.to_string().contains(term))
            .take(QUICK_SEARCH_LIMIT)
            .map(ProductSearchResult::from_product)
            .collect())
    }

    /// Top sellers, low stock and counters.
    pub async fn dashboard(&self) -> Result<Dashboard, AppError> {
        let snapshot = self.repo.snapshot().await?;
        let tree = CategoryTree::new(snapshot.categories);
        let views = catalog::materialize_all(&snapshot.products, &snapshot.movements, &tree)?;
        dashboard::build(&snapshot.movements, &views, &tree, self.limits.top_selling)
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, AppError> {
        let snapshot = self.repo.snapshot().await?;
        let tree = CategoryTree::new(snapshot.categories);
        let views = catalog::materialize_all(&snapshot.products, &snapshot.movements, &tree)?;
        dashboard::summary(&snapshot.movements, &views, tree.len())
    }

    /// Record a movement dated now.
    pub async fn add_movement(
        &self,
        product_id: i64,
        request: &CreateMovementRequest,
    ) -> Result<StockMovement, AppError> {
        self.repo.add_movement(product_id, request).await
    }

    /// Movement history page, newest first.
    pub async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> Result<Page<MovementView>, AppError> {
        let snapshot = self.repo.snapshot().await?;
        let tree = CategoryTree::new(snapshot.categories);
        let history = movements::history(snapshot.movements, &snapshot.products, &tree, filter)?;
        Ok(listing::paginate(history, self.page_request(page, page_size)))
    }
}
