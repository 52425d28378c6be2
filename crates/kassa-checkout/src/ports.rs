//! # Ports
//!
//! The traits the services talk to the outside world through. Production
//! wiring uses the `kassa-db` repositories for the stores; the gateway and
//! fee lookup are supplied by whoever embeds the services.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐     ┌──────────────────┐
//! │  CatalogStore    │     │     OrderStore       │     │  PaymentGateway  │
//! │  (products)      │     │  (pending/settled)   │     │  (hosted page)   │
//! └────────▲─────────┘     └──────────▲───────────┘     └────────▲─────────┘
//!          │                          │                          │
//!   ProductRepository          OrderRepository             adapter / mock
//!
//! ┌──────────────────┐     ┌──────────────────────┐
//! │    FeeLookup     │     │   CartRepository     │  (sync, local file)
//! └────────▲─────────┘     └──────────▲───────────┘
//!          │                          │
//!   StaticFeeTable            FileCartRepository
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CartStoreResult, GatewayResult, StoreResult};
use kassa_core::{CheckoutPayload, LineItem, Money, NewOrder, Order, Product};
use kassa_db::{OrderRepository, ProductRepository};

// =============================================================================
// Stores
// =============================================================================

/// Read access to the shop catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// In-stock products ordered by their display order.
    async fn list_in_stock_products(&self) -> StoreResult<Vec<Product>>;
}

/// Order persistence used by checkout and bookkeeping.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_pending_order(&self, order: NewOrder) -> StoreResult<Order>;

    async fn attach_session(&self, order_id: &str, session_id: &str) -> StoreResult<()>;

    /// Settled orders that carry a processor transaction id.
    async fn list_completed_orders_with_transaction_ids(&self) -> StoreResult<Vec<Order>>;
}

#[async_trait]
impl CatalogStore for ProductRepository {
    async fn list_in_stock_products(&self) -> StoreResult<Vec<Product>> {
        Ok(self.list_in_stock().await?)
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert_pending_order(&self, order: NewOrder) -> StoreResult<Order> {
        Ok(self.insert_pending(&order).await?)
    }

    async fn attach_session(&self, order_id: &str, session_id: &str) -> StoreResult<()> {
        Ok(OrderRepository::attach_session(self, order_id, session_id).await?)
    }

    async fn list_completed_orders_with_transaction_ids(&self) -> StoreResult<Vec<Order>> {
        Ok(self.list_completed_with_transaction_ids().await?)
    }
}

// =============================================================================
// Payment Processor
// =============================================================================

/// A hosted checkout session opened at the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Where to send the customer to pay.
    pub redirect_url: String,
    pub session_id: String,
}

/// Opens checkout sessions. The wire protocol is the adapter's business.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, payload: &CheckoutPayload)
        -> GatewayResult<CheckoutSession>;
}

/// The processor's actual fee for a settled transaction.
#[async_trait]
pub trait FeeLookup: Send + Sync {
    /// `Ok(None)` when the processor has no fee recorded (yet).
    async fn transaction_fee(&self, transaction_id: &str) -> GatewayResult<Option<Money>>;
}

// =============================================================================
// Local Cart
// =============================================================================

/// Where the cart lives between CLI invocations or page loads.
pub trait CartRepository {
    /// The saved cart; empty when nothing has been saved.
    fn load(&self) -> CartStoreResult<Vec<LineItem>>;

    fn save(&self, items: &[LineItem]) -> CartStoreResult<()>;
}
