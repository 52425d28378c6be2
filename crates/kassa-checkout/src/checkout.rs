//! # Checkout Service
//!
//! Turns a cart into a hosted payment session.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit(items, shipping_option_id, request)                             │
//! │                                                                         │
//! │  1. validate_cart ─► select shipping ─► resolve code ─► price_cart      │
//! │     (pure: any failure here returns InvalidCart, nothing is written)    │
//! │                                                                         │
//! │  2. build payload + pending order                                       │
//! │                                                                         │
//! │  3. OrderStore::insert_pending_order ──► failure: warn, keep going      │
//! │                                                                         │
//! │  4. PaymentGateway::create_checkout_session ──► failure: CheckoutError  │
//! │                                                                         │
//! │  5. OrderStore::attach_session ──► failure: warn                        │
//! │                                                                         │
//! │  6. CheckoutRedirect { redirect_url, session_id, order_id }             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway's asynchronous confirmation settles the order. This path
//! only ever writes `pending` orders.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ShopConfig;
use crate::error::CheckoutResult;
use crate::ports::{OrderStore, PaymentGateway};
use kassa_core::{
    build_checkout_payload, build_pending_order, price_cart, validate_cart, CheckoutPayload,
    CheckoutRequest, CheckoutSettings, CoreError, DiscountCatalog, LineItem, NewOrder,
    OrderPricingResult, PricingConfig, ShippingCatalog, ShippingSelection,
};

/// Where to send the customer after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRedirect {
    pub redirect_url: String,
    pub session_id: String,
    /// `None` when the pending order could not be recorded.
    pub order_id: Option<String>,
}

/// A priced cart, before anything is sent anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub shipping: ShippingSelection,
    pub pricing: OrderPricingResult,
}

/// Everything a submission sends out, built without I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCheckout {
    pub payload: CheckoutPayload,
    pub pending_order: NewOrder,
}

// =============================================================================
// Cart Pricer
// =============================================================================

/// Prices carts against the configured shipping options and codes.
#[derive(Debug, Clone)]
pub struct CartPricer {
    pricing: PricingConfig,
    shipping: ShippingCatalog,
    discounts: DiscountCatalog,
    settings: CheckoutSettings,
}

impl CartPricer {
    pub fn new(config: &ShopConfig) -> Self {
        CartPricer {
            pricing: config.pricing,
            shipping: config.shipping_catalog(),
            discounts: config.discount_catalog(),
            settings: config.checkout_settings(),
        }
    }

    pub fn pricing_config(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Prices `items` for display.
    ///
    /// An entered code that matches no configured discount is an error,
    /// never a silent zero discount.
    pub fn quote(
        &self,
        items: &[LineItem],
        shipping_option_id: &str,
        discount_code: Option<&str>,
    ) -> CheckoutResult<Quote> {
        let shipping = self.shipping.select(shipping_option_id)?;
        let discount_percent = match discount_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                self.discounts
                    .resolve(code)
                    .ok_or_else(|| CoreError::InvalidCartState {
                        reason: format!("unknown discount code '{}'", code),
                    })?
            }
            None => 0,
        };

        let pricing = price_cart(items, &shipping, discount_percent, &self.pricing)?;
        Ok(Quote { shipping, pricing })
    }

    /// Validates and prices the cart, then builds the gateway payload and
    /// the pending order.
    pub fn prepare(
        &self,
        items: &[LineItem],
        shipping_option_id: &str,
        request: &CheckoutRequest,
    ) -> CheckoutResult<PreparedCheckout> {
        validate_cart(items)?;
        let code = request.discount_code();
        let Quote { shipping, pricing } = self.quote(items, shipping_option_id, code.as_deref())?;

        let payload = build_checkout_payload(
            items,
            &shipping,
            &pricing,
            request,
            &self.settings,
            &self.pricing,
        )?;
        let pending_order = build_pending_order(items, &shipping, &pricing, request, &self.pricing);

        debug!(
            lines = payload.line_items.len(),
            total = %payload.amount_total,
            shipping = %shipping.option_id,
            "Checkout payload built"
        );

        Ok(PreparedCheckout {
            payload,
            pending_order,
        })
    }
}

// =============================================================================
// Checkout Service
// =============================================================================

/// Orchestrates pricing, the pending order and the gateway call.
pub struct CheckoutService<O, G> {
    orders: O,
    gateway: G,
    pricer: CartPricer,
}

impl<O: OrderStore, G: PaymentGateway> CheckoutService<O, G> {
    pub fn new(orders: O, gateway: G, config: &ShopConfig) -> Self {
        CheckoutService {
            orders,
            gateway,
            pricer: CartPricer::new(config),
        }
    }

    pub fn pricer(&self) -> &CartPricer {
        &self.pricer
    }

    /// Submits a cart for payment.
    ///
    /// ## Returns
    /// * `Ok(CheckoutRedirect)` - The session was opened
    /// * `Err(CheckoutError::InvalidCart)` - Rejected before any I/O
    /// * `Err(_)` - The gateway failed; see [`crate::CheckoutError::is_retryable`]
    pub async fn submit(
        &self,
        items: &[LineItem],
        shipping_option_id: &str,
        request: &CheckoutRequest,
    ) -> CheckoutResult<CheckoutRedirect> {
        let PreparedCheckout {
            payload,
            pending_order,
        } = self.pricer.prepare(items, shipping_option_id, request)?;

        let order_id = match self.orders.insert_pending_order(pending_order).await {
            Ok(order) => Some(order.id),
            Err(e) => {
                warn!(error = %e, "Could not record pending order, continuing to payment");
                None
            }
        };

        let session = match self.gateway.create_checkout_session(&payload).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, order_id = ?order_id, "Checkout session failed");
                return Err(e.into());
            }
        };

        if let Some(id) = &order_id {
            if let Err(e) = self.orders.attach_session(id, &session.session_id).await {
                warn!(order_id = %id, error = %e, "Could not attach session to pending order");
            }
        }

        info!(
            session_id = %session.session_id,
            order_id = ?order_id,
            total = %payload.amount_total,
            "Checkout session created"
        );

        Ok(CheckoutRedirect {
            redirect_url: session.redirect_url,
            session_id: session.session_id,
            order_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_core::{Money, OrderStatus, RoundingPolicy, TaxCategory};

    fn items() -> Vec<LineItem> {
        vec![
            LineItem {
                product_id: "book".to_string(),
                title: "Att bli till".to_string(),
                unit_price_ex_tax: Money::from_kronor(94),
                quantity: 1,
                tax_category: Some(TaxCategory::Book),
            },
            LineItem {
                product_id: "tote".to_string(),
                title: "Tygkasse".to_string(),
                unit_price_ex_tax: Money::from_kronor(120),
                quantity: 1,
                tax_category: Some(TaxCategory::Merchandise),
            },
        ]
    }

    #[test]
    fn test_quote_uses_configured_catalogs() {
        let pricer = CartPricer::new(&ShopConfig::default());

        let quote = pricer.quote(&items(), "world", None).unwrap();
        assert_eq!(quote.shipping.name, "Utanför Europa");
        assert!(quote.pricing.shipping.rate.is_zero());
        assert_eq!(quote.pricing.total.inc_tax, Money::from_kronor(350));

        let discounted = pricer.quote(&items(), "world", Some("Välkommen10")).unwrap();
        assert_eq!(discounted.pricing.products.discount, Money::from_kronor(25));

        assert!(pricer.quote(&items(), "world", Some("  ")).is_ok());
        assert!(matches!(
            pricer.quote(&items(), "world", Some("gratis")),
            Err(crate::CheckoutError::InvalidCart(CoreError::InvalidCartState { .. }))
        ));
    }

    #[test]
    fn test_prepare_builds_matching_payload_and_order() {
        let mut config = ShopConfig::default();
        config.pricing.rounding = RoundingPolicy { unit: 1, cash_unit: 100 };
        config.gateway.site_url = "https://shop.example".to_string();
        let pricer = CartPricer::new(&config);

        let prepared = pricer
            .prepare(&items(), "sweden", &CheckoutRequest::default())
            .unwrap();

        let payload = &prepared.payload;
        let order = &prepared.pending_order;
        assert_eq!(payload.amount_total, order.total_amount);
        assert_eq!(payload.amount_total.ore() % 100, 0);
        assert_eq!(payload.cancel_url, "https://shop.example/butik");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.pricing.as_ref(), Some(&payload.metadata.pricing));
    }

    #[test]
    fn test_prepare_rejects_empty_cart() {
        let pricer = CartPricer::new(&ShopConfig::default());
        let err = pricer
            .prepare(&[], "sweden", &CheckoutRequest::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid cart: cart is empty");
    }
}
