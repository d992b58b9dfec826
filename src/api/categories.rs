//! Category API endpoints.

use std::collections::BTreeSet;

use axum::extract::State;

use super::extract::{Json, Path};
use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Category, CategoryOption, CreateCategoryRequest, UpdateCategoryRequest};
use crate::AppState;

/// GET /api/categories - List all categories.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    success(state.repo.list_categories().await?)
}

/// GET /api/categories/options - Every category with its path.
pub async fn list_category_options(
    State(state): State<AppState>,
) -> ApiResult<Vec<CategoryOption>> {
    success(state.inventory.category_options().await?)
}

/// GET /api/categories/{id} - Get a single category.
pub async fn get_category(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Category> {
    match state.repo.get_category(id).await? {
        Some(category) => success(category),
        None => Err(AppError::not_found("Category", id)),
    }
}

/// GET /api/categories/{id}/path - Resolve the display path.
pub async fn get_category_path(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<CategoryOption> {
    let path = state.inventory.resolve_path(id).await?;
    success(CategoryOption { id, path })
}

/// GET /api/categories/{id}/subtree - The category and all its descendants.
pub async fn get_category_subtree(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<BTreeSet<i64>> {
    success(state.inventory.subtree_ids(id).await?)
}

/// POST /api/categories - Create a new category.
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Category> {
    success(state.repo.create_category(&request).await?)
}

/// PUT /api/categories/{id} - Rename or move a category.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCategoryRequest>,
) -> ApiResult<Category> {
    success(state.repo.update_category(id, &request).await?)
}

/// DELETE /api/categories/{id} - Delete a leaf category and its products.
pub async fn delete_category(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.repo.delete_category(id).await?;
    success(())
}
