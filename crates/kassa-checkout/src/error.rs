//! # Checkout Error Types
//!
//! Error types for the service layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Service Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  GatewayError   │  │   StoreError    │  │     ConfigError         │ │
//! │  │  (adapters)     │  │   (adapters)    │  │     (startup)           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotConfigured  │  │  Database       │  │  Io / Parse             │ │
//! │  │  Network        │  │  Unavailable    │  │  Invalid                │ │
//! │  │  Rejected       │  │                 │  │                         │ │
//! │  └────────┬────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │ CheckoutError: what the customer-facing caller branches on        │ │
//! │  │ InvalidCart │ Configuration │ Network │ Validation │ Gateway      │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use kassa_core::{CoreError, ValidationError};
use kassa_db::DbError;
use thiserror::Error;

// =============================================================================
// Gateway Errors
// =============================================================================

/// Failures reported by a payment gateway or fee lookup adapter.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credentials or endpoint missing. Retrying will not help.
    #[error("Payment gateway is not configured: {0}")]
    NotConfigured(String),

    /// The gateway could not be reached.
    #[error("Network error talking to the payment gateway: {0}")]
    Network(String),

    /// The gateway refused the request as malformed.
    #[error("Invalid request: {0}")]
    Rejected(String),

    /// Anything else the gateway reported.
    #[error("Gateway error: {0}")]
    Other(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Store Errors
// =============================================================================

/// Failures from the catalog or order store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DbError),

    /// A non-database store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Cart File Errors
// =============================================================================

/// Failures reading or writing the local cart file.
#[derive(Debug, Error)]
pub enum CartStoreError {
    #[error("Cart file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cart file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No data directory available for the cart file")]
    NoDataDir,
}

pub type CartStoreResult<T> = Result<T, CartStoreError>;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Failures loading or validating [`crate::config::ShopConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Checkout Errors
// =============================================================================

/// Why a checkout submission failed.
///
/// | Variant         | Retry?                  | HTTP |
/// |-----------------|-------------------------|------|
/// | `InvalidCart`   | after fixing the cart   | 400  |
/// | `Configuration` | never                   | 500  |
/// | `Network`       | yes, with a new session | 502  |
/// | `Validation`    | after fixing the input  | 400  |
/// | `Gateway`       | yes, later              | 500  |
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart was rejected before anything left the process.
    #[error(transparent)]
    InvalidCart(#[from] CoreError),

    #[error("Payment configuration error: {0}")]
    Configuration(String),

    #[error("Network error occurred while processing payment: {0}")]
    Network(String),

    /// The gateway rejected the payload.
    #[error("Invalid order data provided: {0}")]
    Validation(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured(msg) => CheckoutError::Configuration(msg),
            GatewayError::Network(msg) => CheckoutError::Network(msg),
            GatewayError::Rejected(msg) => CheckoutError::Validation(msg),
            GatewayError::Other(msg) => CheckoutError::Gateway(msg),
        }
    }
}

impl CheckoutError {
    /// Short heading for the shop's error toast.
    pub fn user_title(&self) -> &'static str {
        match self {
            CheckoutError::InvalidCart(_) => "Ogiltig varukorg",
            CheckoutError::Configuration(_) => "Betalning ej konfigurerad",
            CheckoutError::Network(_) => "Nätverksfel",
            CheckoutError::Validation(_) => "Ogiltiga uppgifter",
            CheckoutError::Gateway(_) => "Ett fel uppstod",
        }
    }

    /// What to tell the customer.
    pub fn user_message(&self) -> &'static str {
        match self {
            CheckoutError::InvalidCart(_) => "Kontrollera din varukorg och försök igen.",
            CheckoutError::Configuration(_) => {
                "Betalning är inte korrekt konfigurerad. Kontakta supporten."
            }
            CheckoutError::Network(_) => "Kontrollera din internetanslutning och försök igen.",
            CheckoutError::Validation(_) => "Kontrollera dina uppgifter och försök igen.",
            CheckoutError::Gateway(_) => "Kunde inte skapa betalning. Försök igen senare.",
        }
    }

    /// Whether submitting the same cart again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Network(_) | CheckoutError::Gateway(_))
    }

    /// Status code for an HTTP front end.
    pub fn http_status(&self) -> u16 {
        match self {
            CheckoutError::InvalidCart(_) | CheckoutError::Validation(_) => 400,
            CheckoutError::Network(_) => 502,
            CheckoutError::Configuration(_) | CheckoutError::Gateway(_) => 500,
        }
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_map_to_categories() {
        let cases = [
            (GatewayError::NotConfigured("no key".into()), false, 500),
            (GatewayError::Network("timeout".into()), true, 502),
            (GatewayError::Rejected("bad amount".into()), false, 400),
            (GatewayError::Other("boom".into()), true, 500),
        ];
        for (gateway, retryable, status) in cases {
            let err = CheckoutError::from(gateway);
            assert_eq!(err.is_retryable(), retryable, "{err}");
            assert_eq!(err.http_status(), status, "{err}");
        }
    }

    #[test]
    fn test_configuration_is_never_retried() {
        let err = CheckoutError::Configuration("STRIPE_SECRET_KEY missing".into());
        assert!(!err.is_retryable());
        assert_eq!(err.user_title(), "Betalning ej konfigurerad");
    }

    #[test]
    fn test_invalid_cart_message() {
        let err = CheckoutError::from(CoreError::InvalidCartState {
            reason: "cart is empty".into(),
        });
        assert_eq!(err.to_string(), "Invalid cart: cart is empty");
        assert_eq!(err.http_status(), 400);
    }
}
