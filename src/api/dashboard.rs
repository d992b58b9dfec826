//! Dashboard API endpoints.

use axum::extract::State;

use super::{success, ApiResult};
use crate::catalog::{Dashboard, DashboardSummary};
use crate::AppState;

/// GET /api/dashboard - Top sellers, low stock and summary counters.
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    success(state.inventory.dashboard().await?)
}

/// GET /api/dashboard/summary - Summary counters only.
pub async fn get_dashboard_summary(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    success(state.inventory.dashboard_summary().await?)
}
