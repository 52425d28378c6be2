//! Checkout submission against an in-memory order store and a mock gateway.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kassa_checkout::{
    CheckoutError, CheckoutService, CheckoutSession, GatewayError, GatewayResult, OrderStore,
    PaymentGateway, ShopConfig, StoreError, StoreResult,
};
use kassa_core::{
    CheckoutPayload, CheckoutRequest, LineItem, Money, NewOrder, Order, OrderStatus, TaxCategory,
};
use kassa_db::{Database, DbConfig};

// =============================================================================
// Mocks
// =============================================================================

#[derive(Default)]
struct GatewayState {
    session_counter: AtomicU64,
    fail_with: Mutex<Option<fn(String) -> GatewayError>>,
    last_payload: Mutex<Option<CheckoutPayload>>,
}

#[derive(Clone, Default)]
struct MockGateway {
    state: Arc<GatewayState>,
}

impl MockGateway {
    fn failing(kind: fn(String) -> GatewayError) -> Self {
        let gateway = MockGateway::default();
        *gateway.state.fail_with.lock().unwrap() = Some(kind);
        gateway
    }

    fn calls(&self) -> u64 {
        self.state.session_counter.load(Ordering::SeqCst)
    }

    fn last_payload(&self) -> CheckoutPayload {
        self.state.last_payload.lock().unwrap().clone().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        payload: &CheckoutPayload,
    ) -> GatewayResult<CheckoutSession> {
        let n = self.state.session_counter.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.last_payload.lock().unwrap() = Some(payload.clone());

        if let Some(kind) = *self.state.fail_with.lock().unwrap() {
            return Err(kind(format!("mock failure {}", n)));
        }

        let session_id = format!("cs_test_{}", n);
        Ok(CheckoutSession {
            redirect_url: format!("https://pay.example/{}", session_id),
            session_id,
        })
    }
}

/// An order store that is down.
struct UnavailableStore;

#[async_trait]
impl OrderStore for UnavailableStore {
    async fn insert_pending_order(&self, _order: NewOrder) -> StoreResult<Order> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn attach_session(&self, _order_id: &str, _session_id: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn list_completed_orders_with_transaction_ids(&self) -> StoreResult<Vec<Order>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

async fn database() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn book() -> LineItem {
    LineItem {
        product_id: "att-bli-till".to_string(),
        title: "Att bli till".to_string(),
        unit_price_ex_tax: Money::from_kronor(94),
        quantity: 1,
        tax_category: Some(TaxCategory::Book),
    }
}

fn customer(code: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        email: Some("kund@example.se".to_string()),
        user_id: None,
        discount_code: code.map(str::to_string),
        newsletter_opt_in: false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_submit_records_pending_order_and_session() {
    let db = database().await;
    let gateway = MockGateway::default();
    let checkout = CheckoutService::new(db.orders(), gateway.clone(), &ShopConfig::default());

    let redirect = checkout
        .submit(&[book()], "sweden", &customer(None))
        .await
        .unwrap();

    assert_eq!(redirect.session_id, "cs_test_1");
    assert_eq!(redirect.redirect_url, "https://pay.example/cs_test_1");

    let payload = gateway.last_payload();
    assert_eq!(payload.amount_total, Money::from_kronor(139));
    assert_eq!(payload.line_items.len(), 2);
    assert_eq!(payload.line_items[0].name, "Att bli till (inkl. 6% moms)");
    assert_eq!(payload.line_items[0].unit_amount, Money::from_kronor(100));
    assert_eq!(payload.line_items[1].name, "Inom Sverige (inkl. 6% moms)");
    assert_eq!(payload.line_items[1].unit_amount, Money::from_kronor(39));
    assert_eq!(payload.line_items_total(), Some(payload.amount_total));
    assert_eq!(payload.customer_email.as_deref(), Some("kund@example.se"));

    let order_id = redirect.order_id.unwrap();
    let order = db.orders().require(&order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.session_id.as_deref(), Some("cs_test_1"));
    assert_eq!(order.total_amount, Money::from_kronor(139));
    assert_eq!(order.transaction_id, None);
}

#[tokio::test]
async fn test_discount_code_and_guest_email() {
    let db = database().await;
    let gateway = MockGateway::default();
    let checkout = CheckoutService::new(db.orders(), gateway.clone(), &ShopConfig::default());

    let request = CheckoutRequest {
        email: Some("guest@example.com".to_string()),
        ..customer(Some(" VÄLKOMMEN10 "))
    };
    let redirect = checkout.submit(&[book()], "sweden", &request).await.unwrap();

    let payload = gateway.last_payload();
    assert_eq!(payload.customer_email, None);
    assert_eq!(payload.amount_total, Money::from_kronor(129));
    assert_eq!(payload.metadata.discount_amount, Money::from_kronor(10));
    assert_eq!(payload.metadata.discount_code.as_deref(), Some("VÄLKOMMEN10"));

    let order = db.orders().require(&redirect.order_id.unwrap()).await.unwrap();
    assert_eq!(order.email, "pending@checkout.temp");
    assert_eq!(order.discount_amount, Money::from_kronor(10));
}

#[tokio::test]
async fn test_invalid_cart_never_reaches_gateway() {
    let db = database().await;
    let gateway = MockGateway::default();
    let checkout = CheckoutService::new(db.orders(), gateway.clone(), &ShopConfig::default());

    let empty = checkout.submit(&[], "sweden", &customer(None)).await;
    assert!(matches!(empty, Err(CheckoutError::InvalidCart(_))));

    let mut zero = book();
    zero.quantity = 0;
    let zero_qty = checkout.submit(&[zero], "sweden", &customer(None)).await;
    assert!(matches!(zero_qty, Err(CheckoutError::InvalidCart(_))));

    let unknown_code = checkout
        .submit(&[book()], "sweden", &customer(Some("gratis")))
        .await;
    assert!(matches!(unknown_code, Err(CheckoutError::InvalidCart(_))));

    let unknown_shipping = checkout.submit(&[book()], "mars", &customer(None)).await;
    assert!(matches!(unknown_shipping, Err(CheckoutError::InvalidCart(_))));

    assert_eq!(gateway.calls(), 0);
    assert!(db.orders().list_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_gateway_failure_leaves_order_pending() {
    let db = database().await;
    let gateway = MockGateway::failing(GatewayError::Network);
    let checkout = CheckoutService::new(db.orders(), gateway.clone(), &ShopConfig::default());

    let err = checkout
        .submit(&[book()], "sweden", &customer(None))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Network(_)));
    assert!(err.is_retryable());
    assert_eq!(err.user_title(), "Nätverksfel");

    let orders = db.orders().list_recent(10).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);
    assert_eq!(orders[0].session_id, None);
}

#[tokio::test]
async fn test_configuration_error_is_not_retryable() {
    let db = database().await;
    let gateway = MockGateway::failing(GatewayError::NotConfigured);
    let checkout = CheckoutService::new(db.orders(), gateway, &ShopConfig::default());

    let err = checkout
        .submit(&[book()], "sweden", &customer(None))
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Configuration(_)));
    assert!(!err.is_retryable());
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn test_store_outage_does_not_block_payment() {
    let gateway = MockGateway::default();
    let checkout = CheckoutService::new(UnavailableStore, gateway.clone(), &ShopConfig::default());

    let redirect = checkout
        .submit(&[book()], "sweden", &customer(None))
        .await
        .unwrap();

    assert_eq!(redirect.order_id, None);
    assert_eq!(gateway.calls(), 1);
}
