//! Stock movement API endpoints.

use axum::extract::State;
use chrono::NaiveDate;
use serde::Deserialize;

use super::extract::{Json, Path, Query};
use super::{success, ApiResult};
use crate::catalog::{MovementFilter, MovementView, Page};
use crate::models::{CreateMovementRequest, StockMovement};
use crate::AppState;

/// Movement history query parameters. Dates are `YYYY-MM-DD`, inclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMovementsQuery {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub product_search: Option<String>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// POST /api/products/{id}/movements - Record a stock movement.
pub async fn add_movement(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(request): Json<CreateMovementRequest>,
) -> ApiResult<StockMovement> {
    success(state.inventory.add_movement(product_id, &request).await?)
}

/// GET /api/movements - Movement history, newest first.
pub async fn list_movements(
    State(state): State<AppState>,
    Query(params): Query<ListMovementsQuery>,
) -> ApiResult<Page<MovementView>> {
    let filter = MovementFilter {
        product_id: params.product_id,
        product_search: params.product_search,
        from: params.from,
        to: params.to,
    };
    let page = state
        .inventory
        .list_movements(&filter, params.page, params.page_size)
        .await?;
    success(page)
}
