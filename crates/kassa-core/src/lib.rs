//! # kassa-core: Pure Pricing and VAT Logic for Kassa
//!
//! This crate is the **heart** of Kassa, the web shop back office of a
//! small Swedish book publisher. It prices carts with mixed VAT rates and
//! reconciles settled orders for bookkeeping, as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kassa Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Shop front end / admin CLI                   │   │
//! │  │    Cart UI ──► Checkout ──► Gateway ──► Bookkeeping export      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 kassa-checkout (services)                       │   │
//! │  │    CheckoutService, AccountingService, fetch_fees               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kassa-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌────────────────┐   │   │
//! │  │   │  money   │ │ pricing  │ │ checkout │ │   accounting   │   │   │
//! │  │   │   tax    │ │   cart   │ │  payload │ │     export     │   │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kassa-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type and rational rounding (no floating point!)
//! - [`types`] - Catalog and cart types (Product, LineItem, TaxRate, ...)
//! - [`tax`] - VAT rates, rounding policy, shipping rate rule
//! - [`pricing`] - Cart → [`pricing::OrderPricingResult`]
//! - [`cart`] - Cart operations, discount codes, shipping options
//! - [`checkout`] - Gateway payload and pending order builders
//! - [`order`] - Persisted orders and the order state machine
//! - [`accounting`] - Order → bookkeeping row reconciliation
//! - [`export`] - Bookkeeping CSV
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in öre (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use kassa_core::money::Money;
//! use kassa_core::types::TaxRate;
//!
//! // A book at 94 kr ex. moms costs 100 kr in the shop.
//! let price = Money::from_kronor(94);
//! let gross = price.to_gross(TaxRate::from_percent(6), 100);
//! assert_eq!(gross, Money::from_kronor(100));
//!
//! // The moms is whatever the back-out leaves.
//! let net = gross.to_net(TaxRate::from_percent(6), 100);
//! assert_eq!(gross - net, Money::from_kronor(6));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod accounting;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod export;
pub mod money;
pub mod order;
pub mod pricing;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use kassa_core::Money` instead of
// `use kassa_core::money::Money`

pub use accounting::{
    booking_date, build_ledger, reconcile_order, AccountingRow, AccountingTotals, DateRange, FeeMap, FeeStatus,
    Ledger,
};
pub use cart::{Cart, DiscountCatalog, ShippingCatalog};
pub use checkout::{
    build_checkout_payload, build_pending_order, validate_cart, CheckoutPayload, CheckoutRequest,
    CheckoutSettings,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use export::{export_file_name, render_csv};
pub use money::Money;
pub use order::{NewOrder, Order, OrderItem, OrderStatus, ShippingMetadata};
pub use pricing::{price_cart, OrderPricingResult, TaxBreakdownBucket};
pub use tax::{PricingConfig, RoundingPolicy, VatRates};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps gateway sessions a reasonable size.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price (ex. tax) a cart line may carry: 1 000 000 kr
///
/// ## Business Reason
/// Keeps every cart total far inside `i64` öre, so pricing never overflows.
pub const MAX_UNIT_PRICE_ORE: i64 = 100_000_000;
