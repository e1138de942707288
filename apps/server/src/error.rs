//! Error types for the HTTP API.
//!
//! Every failure a handler can return ends up as one JSON body:
//!
//! ```json
//! { "code": "NOT_FOUND", "message": "Invoice not found: 42", "redirect": "/" }
//! ```
//!
//! | Source                          | Status | Code                 |
//! |---------------------------------|--------|----------------------|
//! | `ValidationError`               | 400    | `VALIDATION_ERROR`   |
//! | missing/invalid session         | 401    | `UNAUTHENTICATED`    |
//! | wrong email or password         | 401    | `INVALID_CREDENTIALS`|
//! | `NotFound` (db or core)         | 404    | `NOT_FOUND`          |
//! | duplicate email                 | 409    | `CONFLICT`           |
//! | oversell with negative stock off| 409    | `INSUFFICIENT_STOCK` |
//! | invoice status rules            | 422    | `BUSINESS_LOGIC`     |
//! | cart state machine              | 422    | `CART_ERROR`         |
//! | store failures                  | 500    | `DATABASE_ERROR`     |
//!
//! Email failures never come through here; they travel in the `email`
//! outcome of the save that triggered them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use tillbook_core::{CoreError, ValidationError};
use tillbook_db::DbError;

/// Where the frontend should go when an invoice is missing.
pub const INVOICES_VIEW: &str = "/";
pub const PRODUCTS_VIEW: &str = "/products";
pub const SALES_VIEW: &str = "/sales";
pub const LOGIN_VIEW: &str = "/login";

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// Wrong email or wrong password; the two are not told apart.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{message}")]
    NotFound {
        message: String,
        redirect: &'static str,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    BusinessLogic(String),

    #[error("{0}")]
    Cart(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'static str>,
}

impl ApiError {
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        ApiError::Unauthenticated(reason.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::InsufficientStock(_) => StatusCode::CONFLICT,
            ApiError::BusinessLogic(_) | ApiError::Cart(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            ApiError::BusinessLogic(_) => "BUSINESS_LOGIC",
            ApiError::Cart(_) => "CART_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, field, redirect) = match self {
            ApiError::Validation(e) => (e.to_string(), Some(e.field().to_string()), None),
            ApiError::Unauthenticated(_) => {
                ("Please sign in to continue".to_string(), None, Some(LOGIN_VIEW))
            }
            ApiError::NotFound { message, redirect } => (message.clone(), None, Some(*redirect)),
            // Details stay in the log
            ApiError::Database(_) => ("Something went wrong. Please try again.".to_string(), None, None),
            ApiError::Internal(_) => ("Internal server error".to_string(), None, None),
            other => (other.to_string(), None, None),
        };
        ErrorBody {
            code: self.code(),
            message,
            field,
            redirect,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "Request failed");
        }
        (status, Json(self.body())).into_response()
    }
}

fn redirect_for(entity: &str) -> &'static str {
    match entity {
        "Product" => PRODUCTS_VIEW,
        "Sale" => SALES_VIEW,
        _ => INVOICES_VIEW,
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { ref entity, .. } => ApiError::NotFound {
                redirect: redirect_for(entity),
                message: err.to_string(),
            },
            DbError::UniqueViolation { .. } => ApiError::Conflict(err.to_string()),
            DbError::InsufficientStock { .. } => ApiError::InsufficientStock(err.to_string()),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ApiError::Validation(v),
            CoreError::ProductNotFound(_) => ApiError::NotFound {
                message: err.to_string(),
                redirect: PRODUCTS_VIEW,
            },
            CoreError::InvoiceNotFound(_) => ApiError::NotFound {
                message: err.to_string(),
                redirect: INVOICES_VIEW,
            },
            CoreError::SaleNotFound(_) => ApiError::NotFound {
                message: err.to_string(),
                redirect: SALES_VIEW,
            },
            CoreError::InsufficientStock { .. } => ApiError::InsufficientStock(err.to_string()),
            CoreError::InvalidStatusTransition { .. } => ApiError::BusinessLogic(err.to_string()),
            CoreError::CartEmpty
            | CoreError::CheckoutInProgress
            | CoreError::NotInCart(_)
            | CoreError::CartTooLarge { .. }
            | CoreError::QuantityTooLarge { .. } => ApiError::Cart(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_not_found_redirects_to_list_view() {
        let err: ApiError = DbError::not_found("Invoice", "42").into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.body().redirect, Some("/"));

        let err: ApiError = DbError::not_found("Product", "7").into();
        assert_eq!(err.body().redirect, Some("/products"));
    }

    #[test]
    fn test_validation_carries_field() {
        let err: ApiError = ValidationError::Required {
            field: "client".to_string(),
        }
        .into();
        let body = err.body();
        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(body.field.as_deref(), Some("client"));
    }

    #[test]
    fn test_store_errors_are_generic() {
        let err: ApiError = DbError::QueryFailed("disk I/O error".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.body().message.contains("disk"));
    }

    #[test]
    fn test_cart_errors_are_unprocessable() {
        let err: ApiError = CoreError::CartEmpty.into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "CART_ERROR");
    }
}
