//! # kassa-checkout: Checkout and Bookkeeping Services for Kassa
//!
//! The I/O edge around `kassa-core`: opening payment sessions, recording
//! pending orders, looking up processor fees and keeping the local cart.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Catalog store ──► Cart ──► CheckoutService ──► PaymentGateway        │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │                              OrderStore (pending)                       │
//! │                                    │                                    │
//! │                  gateway settles ──┘ (completed + transaction id)       │
//! │                                    │                                    │
//! │                                    ▼                                    │
//! │   FeeLookup ──► fetch_fees ──► AccountingService ──► Ledger ──► CSV     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`ports`] - Store, gateway, fee and cart traits
//! - [`checkout`] - `CartPricer` and the `CheckoutService` submission flow
//! - [`fees`] - Concurrent fee lookup and the static fee table
//! - [`accounting`] - `AccountingService` ledger and CSV export
//! - [`cart_store`] - JSON file cart repository
//! - [`config`] - `ShopConfig` (TOML + `KASSA_*` environment)
//! - [`error`] - Service error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kassa_checkout::{CheckoutService, ShopConfig};
//! use kassa_db::{Database, DbConfig};
//!
//! let config = ShopConfig::load_or_default(None);
//! let db = Database::new(DbConfig::new(config.database_path()?)).await?;
//!
//! let checkout = CheckoutService::new(db.orders(), gateway, &config);
//! let redirect = checkout.submit(&items, "sweden", &request).await?;
//! println!("Pay at {}", redirect.redirect_url);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod accounting;
pub mod cart_store;
pub mod checkout;
pub mod config;
pub mod error;
pub mod fees;
pub mod ports;

// =============================================================================
// Re-exports
// =============================================================================

pub use accounting::{AccountingService, CsvExport};
pub use cart_store::FileCartRepository;
pub use checkout::{CartPricer, CheckoutRedirect, CheckoutService, PreparedCheckout, Quote};
pub use config::{DatabaseSettings, GatewaySettings, ShopConfig};
pub use error::{
    CartStoreError, CheckoutError, CheckoutResult, ConfigError, ConfigResult, GatewayError,
    GatewayResult, StoreError, StoreResult,
};
pub use fees::{fetch_fees, StaticFeeTable};
pub use ports::{
    CartRepository, CatalogStore, CheckoutSession, FeeLookup, OrderStore, PaymentGateway,
};
