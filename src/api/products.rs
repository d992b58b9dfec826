//! Product API endpoints.

use axum::extract::State;
use serde::Deserialize;

use super::extract::{Json, Path, Query};
use super::{success, ApiResult};
use crate::catalog::{Page, ProductFilter, ProductView, SortKey, SortOrder};
use crate::models::{
    CreateProductRequest, Product, ProductOption, ProductSearchResult, UpdateProductRequest,
};
use crate::AppState;

/// Product listing query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
    /// Category path substring.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub negative_only: bool,
    #[serde(default)]
    pub low_only: bool,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub order: SortOrder,
    /// 1-indexed page number (default: 1).
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl ListProductsQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            category_id: self.category_id,
            search: self.search.clone(),
            path: self.path.clone(),
            negative_only: self.negative_only,
            low_only: self.low_only,
        }
    }
}

/// Quick search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchProductsQuery {
    #[serde(default)]
    pub term: String,
}

/// GET /api/products - Filtered, sorted, paginated product views.
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsQuery>,
) -> ApiResult<Page<ProductView>> {
    let page = state
        .inventory
        .list_product_views(
            &params.filter(),
            params.sort,
            params.order,
            params.page,
            params.page_size,
        )
        .await?;
    success(page)
}

/// GET /api/products/options - Products labelled with their full path.
pub async fn list_product_options(State(state): State<AppState>) -> ApiResult<Vec<ProductOption>> {
    success(state.inventory.product_options().await?)
}

/// GET /api/products/search - Autocomplete by name or id.
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchProductsQuery>,
) -> ApiResult<Vec<ProductSearchResult>> {
    success(state.inventory.search_products(&params.term).await?)
}

/// GET /api/products/{id} - Product view with stock, path and status.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<ProductView> {
    success(state.inventory.product_view(id).await?)
}

/// POST /api/products - Create a new product.
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> ApiResult<Product> {
    success(state.repo.create_product(&request).await?)
}

/// PUT /api/products/{id} - Update a product.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateProductRequest>,
) -> ApiResult<Product> {
    success(state.repo.update_product(id, &request).await?)
}

/// DELETE /api/products/{id} - Delete a product and its ledger.
pub async fn delete_product(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.repo.delete_product(id).await?;
    success(())
}
