//! Error handling module for the stock ledger backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const BROKEN_HIERARCHY: &str = "BROKEN_HIERARCHY";
    pub const CYCLIC_HIERARCHY: &str = "CYCLIC_HIERARCHY";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONCURRENT_MODIFICATION: &str = "CONCURRENT_MODIFICATION";
    pub const HAS_SUBCATEGORIES: &str = "HAS_SUBCATEGORIES";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Referenced entity is absent
    #[error("{0}")]
    NotFound(String),
    /// A parent reference points at a category that does not exist
    #[error("category {category_id} references missing parent {missing_parent_id}")]
    BrokenHierarchy {
        category_id: i64,
        missing_parent_id: i64,
    },
    /// Ancestor or descendant traversal revisited a category
    #[error("category hierarchy contains a cycle at category {category_id}")]
    CyclicHierarchy { category_id: i64 },
    /// Field constraints violated
    #[error("{0}")]
    Validation(String),
    /// Write lost a race against a concurrent update of the same row
    #[error("{message}")]
    ConcurrentModification {
        message: String,
        current_version: i64,
    },
    /// Category deletion refused because subcategories still exist
    #[error("category {0} still has subcategories")]
    HasSubcategories(i64),
    /// Malformed request
    #[error("{0}")]
    BadRequest(String),
    /// Database error
    #[error("{0}")]
    Database(String),
    /// Internal server error
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BrokenHierarchy { .. } | AppError::CyclicHierarchy { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ConcurrentModification { .. } => StatusCode::CONFLICT,
            AppError::HasSubcategories(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::BrokenHierarchy { .. } => codes::BROKEN_HIERARCHY,
            AppError::CyclicHierarchy { .. } => codes::CYCLIC_HIERARCHY,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::ConcurrentModification { .. } => codes::CONCURRENT_MODIFICATION,
            AppError::HasSubcategories(_) => codes::HAS_SUBCATEGORIES,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    pub fn not_found(kind: &str, id: i64) -> Self {
        AppError::NotFound(format!("{} {} not found", kind, id))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected JSON body: {}", rejection.body_text());
        AppError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::ConcurrentModification {
                current_version, ..
            } => Some(serde_json::json!({ "currentVersion": current_version })),
            AppError::BrokenHierarchy {
                category_id,
                missing_parent_id,
            } => Some(serde_json::json!({
                "categoryId": category_id,
                "missingParentId": missing_parent_id,
            })),
            AppError::CyclicHierarchy { category_id } => {
                Some(serde_json::json!({ "categoryId": category_id }))
            }
            _ => None,
        };

        // Store internals stay in the log, not in the response body.
        let message = match error {
            AppError::Database(_) | AppError::Internal(_) => {
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message,
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            AppError::BrokenHierarchy { .. } | AppError::CyclicHierarchy { .. }
        ) {
            tracing::error!("Category store corruption: {}", self);
        }
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
