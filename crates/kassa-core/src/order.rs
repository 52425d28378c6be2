//! # Orders
//!
//! Persisted order types and the order status state machine.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT SUBMITTED                                                  │
//! │     └── insert_pending_order() → Order { status: Pending }              │
//! │     └── attach_session()       → session_id recorded                    │
//! │                                                                         │
//! │  2. GATEWAY CONFIRMS (asynchronously)                                   │
//! │     └── mark_completed()       → Order { status: Completed,             │
//! │                                          transaction_id: Some(..) }     │
//! │                                                                         │
//! │  3. OR ABANDONED / DECLINED                                             │
//! │     └── update_status()        → Failed | Canceled                      │
//! │                                                                         │
//! │  Completed, Failed and Canceled are terminal.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{OrderPricingResult, ShippingBreakdown};
use crate::types::{ShippingRegion, ShippingSelection, TaxCategory, TaxRate};

/// Length of the short order number shown to customers and bookkeepers.
pub const ORDER_NUMBER_LEN: usize = 8;

// =============================================================================
// Order Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created at checkout, waiting for the gateway.
    #[default]
    Pending,
    /// Paid and settled.
    Completed,
    /// Payment declined or errored.
    Failed,
    /// Customer abandoned or shop canceled.
    Canceled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Only `pending → completed | failed | canceled` is legal.
    pub const fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (
                OrderStatus::Pending,
                OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Canceled
            )
        )
    }

    /// Returns `next` if the move is legal.
    pub fn transition(self, next: OrderStatus) -> CoreResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "failed" => Ok(OrderStatus::Failed),
            "canceled" => Ok(OrderStatus::Canceled),
            other => Err(format!("unknown order status '{}'", other)),
        }
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A purchased line as charged: the gross unit price is frozen here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub product_id: String,
    pub title: String,
    /// Older orders stored this as `price`.
    #[serde(alias = "price")]
    pub unit_price_inc_tax: Money,
    pub quantity: i64,
    #[serde(default)]
    pub tax_category: Option<TaxCategory>,
}

impl OrderItem {
    /// Gross unit price times quantity. Fails instead of wrapping.
    pub fn line_total(&self) -> CoreResult<Money> {
        self.unit_price_inc_tax
            .checked_mul(self.quantity)
            .ok_or_else(|| {
                CoreError::invalid_cart(format!(
                    "line total for '{}' overflows ({} × {})",
                    self.title, self.unit_price_inc_tax, self.quantity
                ))
            })
    }
}

// =============================================================================
// Shipping Metadata
// =============================================================================

/// Shipping as charged, with its tax split frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingMetadata {
    pub option_id: String,
    pub name: String,
    pub region: ShippingRegion,
    pub price_ex_tax: Money,
    pub tax: Money,
    pub price_inc_tax: Money,
    pub tax_rate: TaxRate,
}

impl ShippingMetadata {
    pub fn new(selection: &ShippingSelection, breakdown: &ShippingBreakdown) -> Self {
        ShippingMetadata {
            option_id: selection.option_id.clone(),
            name: selection.name.clone(),
            region: selection.region,
            price_ex_tax: breakdown.bucket.ex_tax(),
            tax: breakdown.bucket.tax(),
            price_inc_tax: breakdown.bucket.inc_tax(),
            tax_rate: breakdown.rate,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Checkout session at the payment gateway.
    pub session_id: Option<String>,
    /// Settled payment at the processor; set when the order completes.
    pub transaction_id: Option<String>,
    pub user_id: Option<String>,
    pub email: String,
    /// The charged amount, moms included.
    pub total_amount: Money,
    pub discount_amount: Money,
    pub discount_code: Option<String>,
    pub items: Vec<OrderItem>,
    pub shipping: Option<ShippingMetadata>,
    /// Pricing snapshot taken at checkout. Absent on legacy orders.
    pub pricing: Option<OrderPricingResult>,
    pub newsletter_opt_in: bool,
    pub status: OrderStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Short order number: the first eight characters of the id.
    pub fn order_number(&self) -> &str {
        match self.id.char_indices().nth(ORDER_NUMBER_LEN) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// An order about to be stored. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub email: String,
    pub total_amount: Money,
    pub discount_amount: Money,
    pub discount_code: Option<String>,
    pub items: Vec<OrderItem>,
    pub shipping: Option<ShippingMetadata>,
    pub pricing: Option<OrderPricingResult>,
    pub newsletter_opt_in: bool,
    pub status: OrderStatus,
}

// =============================================================================
// Unit Tests
// =============================================================================
