//! Stock Ledger Backend
//!
//! Inventory REST backend: a category tree, products, and an append-only
//! stock ledger, persisted in SQLite.

mod api;
mod catalog;
mod config;
mod db;
mod errors;
mod models;
mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use services::{InventoryService, Limits};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub inventory: InventoryService,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: &Config) -> Self {
        Self {
            inventory: InventoryService::new(repo.clone(), Limits::from(config)),
            repo,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Starting Stock Ledger Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!(
        "Page size: default {}, max {}",
        config.default_page_size,
        config.max_page_size
    );

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let state = AppState::new(repo, &config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Categories
        .route(
            "/categories",
            get(api::list_categories).post(api::create_category),
        )
        .route("/categories/options", get(api::list_category_options))
        .route(
            "/categories/{id}",
            get(api::get_category)
                .put(api::update_category)
                .delete(api::delete_category),
        )
        .route("/categories/{id}/path", get(api::get_category_path))
        .route("/categories/{id}/subtree", get(api::get_category_subtree))
        // Products
        .route(
            "/products",
            get(api::list_products).post(api::create_product),
        )
        .route("/products/options", get(api::list_product_options))
        .route("/products/search", get(api::search_products))
        .route(
            "/products/{id}",
            get(api::get_product)
                .put(api::update_product)
                .delete(api::delete_product),
        )
        .route("/products/{id}/movements", post(api::add_movement))
        // Movements
        .route("/movements", get(api::list_movements))
        // Dashboard
        .route("/dashboard", get(api::get_dashboard))
        .route("/dashboard/summary", get(api::get_dashboard_summary));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
