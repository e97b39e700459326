//! Business-rule and input errors.
//!
//! [`CoreError`] is what a rule check returns; [`ValidationError`] describes a
//! single bad field and converts into it. The storage crate wraps both in its
//! service error, and the server maps that to a status and an error code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// An order was submitted with no lines.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// Product does not exist or has been deactivated.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A line asked for zero or a negative quantity.
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: String, quantity: i64 },

    /// Stock on hand can't cover a line. The whole order is rejected and
    /// nothing is written.
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// The sale is already in its terminal CANCELED state.
    #[error("Sale {0} is already canceled")]
    AlreadyCanceled(String),

    /// User not found (or not visible to the requester).
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Requester's role or ownership does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Username/password pair did not match an account.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }
}

/// One field failed validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Missing, or blank after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must not be negative")]
    Negative { field: String },

    /// An amount that no longer fits in 64-bit cents.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Not an integer, not a date, and similar.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A range whose end precedes its start.
    #[error("{later} must not be before {earlier}")]
    Order { earlier: String, later: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_and_cancel_messages() {
        let err = CoreError::InsufficientStock {
            code: "COCA-500".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COCA-500: available 3, requested 5"
        );
        assert_eq!(
            CoreError::AlreadyCanceled("s-1".to_string()).to_string(),
            "Sale s-1 is already canceled"
        );
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::Order {
            earlier: "startDate".to_string(),
            later: "endDate".to_string(),
        };
        assert_eq!(err.to_string(), "endDate must not be before startDate");
    }

    #[test]
    fn validation_wraps_into_core_error() {
        let err = CoreError::from(ValidationError::Negative {
            field: "stock".into(),
        });
        assert!(matches!(err, CoreError::Validation(ValidationError::Negative { .. })));
        assert_eq!(err.to_string(), "Validation error: stock must not be negative");
    }
}
