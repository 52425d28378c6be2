//! # Error Types
//!
//! Domain-specific error types for kassa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kassa-core errors (this file)                                         │
//! │  ├── CoreError        - Pricing, cart and order-lifecycle failures     │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kassa-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  kassa-checkout errors (separate crate)                                │
//! │  └── CheckoutError    - What the shop front end sees                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → Customer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Computational errors fail loudly. The only silent default in the crate is
//! the legacy rule that an item with no tax category is taxed as a book.

use thiserror::Error;

use crate::order::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The cart cannot be priced or checked out as it stands.
    ///
    /// ## When This Occurs
    /// - Checkout is attempted with an empty cart
    /// - A line has quantity < 1
    /// - A line has a negative unit price
    ///
    /// Raised before any gateway call is made.
    #[error("Invalid cart: {reason}")]
    InvalidCartState { reason: String },

    /// Discount percentage outside 0-100.
    #[error("Discount must be between 0 and 100 percent, got {percent}")]
    InvalidDiscount { percent: u32 },

    /// An order lifecycle move that the state machine forbids.
    ///
    /// ## User Workflow
    /// ```text
    /// Order (completed)
    ///      │
    ///      ▼
    /// cancel requested
    ///      │
    ///      ▼
    /// InvalidStatusTransition { from: Completed, to: Canceled }
    /// ```
    #[error("Order cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Shipping option id not present in the configured table.
    #[error("Unknown shipping option: {0}")]
    UnknownShippingOption(String),

    /// Cart has exceeded maximum allowed items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Product is not in the cart.
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(String),

    /// The bookkeeping CSV could not be written.
    #[error("CSV export failed: {0}")]
    Export(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub(crate) fn invalid_cart(reason: impl Into<String>) -> Self {
        CoreError::InvalidCartState {
            reason: reason.into(),
        }
    }
}

impl From<csv::Error> for CoreError {
    fn from(err: csv::Error) -> Self {
        CoreError::Export(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed e-mail).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., the same discount code twice).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
