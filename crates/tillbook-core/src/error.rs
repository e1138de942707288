//! # Error Types
//!
//! Domain-specific error types for tillbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillbook-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Form input failures (always carry a field)     │
//! │                                                                         │
//! │  tillbook-db errors (separate crate)                                   │
//! │  └── DbError          - Store failures, wraps CoreError for checkout   │
//! │                                                                         │
//! │  tillbook-server errors                                                │
//! │  └── ApiError         - What the HTTP client sees (JSON)               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the pure domain logic.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Product cannot be found (or belongs to another user).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Invoice cannot be found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Selling more than is on the shelf while negative stock is disallowed.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: Cola x5
    ///      │
    ///      ▼
    /// Checkout, stock on shelf = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Cola", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Nothing written, cart stays populated
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    CartEmpty,

    /// A checkout is already being committed for this cart.
    #[error("Checkout already in progress")]
    CheckoutInProgress,

    /// Line operation on a product that is not in the cart.
    #[error("Product {0} not in cart")]
    NotInCart(String),

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Invoice status change that the lifecycle does not allow.
    #[error("Invoice cannot move from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the form field it belongs to so the client can put
/// the message next to the right input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value did not parse as a number.
    #[error("{field} must be a number")]
    NotANumber { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date, bad email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Date lies before today.
    #[error("{field} cannot be in the past")]
    DateInPast { field: String },

    /// Two fields that must agree do not.
    #[error("{field} does not match")]
    Mismatch { field: String },
}

impl ValidationError {
    /// Name of the form field this error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Negative { field }
            | ValidationError::MustBePositive { field }
            | ValidationError::NotANumber { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::DateInPast { field }
            | ValidationError::Mismatch { field } => field,
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Cola".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Cola: available 3, requested 5"
        );
        assert_eq!(
            CoreError::InvalidStatusTransition {
                from: "Paid".to_string(),
                to: "Pending".to_string()
            }
            .to_string(),
            "Invoice cannot move from Paid to Pending"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::DateInPast {
            field: "dueDate".to_string(),
        };
        assert_eq!(err.to_string(), "dueDate cannot be in the past");
    }

    #[test]
    fn test_validation_error_field() {
        let err = ValidationError::NotANumber {
            field: "price".to_string(),
        };
        assert_eq!(err.field(), "price");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "client".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
