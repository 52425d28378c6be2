//! # Checkout Payload
//!
//! Pure builders for what checkout sends to the payment gateway and what it
//! stores as the pending order. No I/O happens here; the orchestration that
//! talks to the gateway and the order store lives in `kassa-checkout`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart + shipping + OrderPricingResult                                   │
//! │        │                                                                │
//! │        ├──► build_checkout_payload() ──► CheckoutPayload ──► gateway   │
//! │        │       line names carry the moms note                           │
//! │        │       shipping gross = pricing.shipping.inc_tax                │
//! │        │                                                                │
//! │        └──► build_pending_order()    ──► NewOrder (pending) ──► store  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::order::{NewOrder, OrderItem, OrderStatus, ShippingMetadata};
use crate::pricing::{validate_lines, OrderPricingResult};
use crate::tax::PricingConfig;
use crate::types::{LineItem, ShippingSelection};

/// E-mail the shop front end sends for customers who are not signed in.
/// Never forwarded to the gateway as the customer's address.
pub const GUEST_EMAIL_PLACEHOLDER: &str = "guest@example.com";

/// Stored on the pending order until the gateway reports the real address.
pub const PENDING_EMAIL_FALLBACK: &str = "pending@checkout.temp";

/// Placeholder the gateway replaces with the session id in the success URL.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

// =============================================================================
// Inputs
// =============================================================================

/// Shop-wide settings for gateway sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSettings {
    pub currency: String,
    pub locale: String,
    pub success_url: String,
    pub cancel_url: String,
    pub allowed_countries: Vec<String>,
    pub require_billing_address: bool,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            currency: "sek".to_string(),
            locale: "sv".to_string(),
            success_url: format!("http://localhost:3000/success?session_id={}", SESSION_ID_PLACEHOLDER),
            cancel_url: "http://localhost:3000/butik".to_string(),
            allowed_countries: ["SE", "NO", "DK", "FI"].iter().map(|c| c.to_string()).collect(),
            require_billing_address: true,
        }
    }
}

/// Who is checking out and with what extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub discount_code: Option<String>,
    #[serde(default)]
    pub newsletter_opt_in: bool,
}

impl CheckoutRequest {
    /// The customer's real e-mail, if one is known.
    pub fn known_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty() && *e != GUEST_EMAIL_PLACEHOLDER)
    }

    /// The entered discount code, trimmed; `None` when left blank.
    pub fn discount_code(&self) -> Option<String> {
        self.discount_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// Payload
// =============================================================================

/// One line on the gateway's checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GatewayLineItem {
    pub name: String,
    /// Gross unit price.
    pub unit_amount: Money,
    pub quantity: i64,
}

/// Order details echoed back by the gateway on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutMetadata {
    pub order_items: Vec<OrderItem>,
    pub shipping: ShippingMetadata,
    pub discount_code: Option<String>,
    pub discount_amount: Money,
    pub pricing: OrderPricingResult,
    pub newsletter_opt_in: bool,
}

/// Everything the gateway needs to open a checkout session.
///
/// `amount_total` is the amount to charge. It differs from the sum of the
/// line items by the discount and the cash rounding, which the gateway
/// adapter applies as a session-level adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutPayload {
    pub currency: String,
    pub locale: String,
    pub success_url: String,
    pub cancel_url: String,
    pub allowed_countries: Vec<String>,
    pub require_billing_address: bool,
    pub customer_email: Option<String>,
    pub line_items: Vec<GatewayLineItem>,
    pub amount_total: Money,
    pub metadata: CheckoutMetadata,
}

impl CheckoutPayload {
    /// Sum of the line items before any session-level adjustment. `None`
    /// on overflow.
    pub fn line_items_total(&self) -> Option<Money> {
        self.line_items.iter().try_fold(Money::zero(), |acc, l| {
            l.unit_amount.checked_mul(l.quantity)?.checked_add(acc)
        })
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Rejects a cart that must not reach the gateway.
pub fn validate_cart(items: &[LineItem]) -> CoreResult<()> {
    if items.is_empty() {
        return Err(CoreError::invalid_cart("cart is empty"));
    }
    validate_lines(items)
}

/// Freezes cart lines at their gross unit price, the way they are charged.
pub fn order_items(items: &[LineItem], config: &PricingConfig) -> Vec<OrderItem> {
    items
        .iter()
        .map(|item| {
            let rate = config.rates.rate_for(item.tax_category);
            OrderItem {
                product_id: item.product_id.clone(),
                title: item.title.clone(),
                unit_price_inc_tax: item.unit_price_ex_tax.to_gross(rate, config.rounding.unit),
                quantity: item.quantity,
                tax_category: item.tax_category,
            }
        })
        .collect()
}

/// Builds the gateway session request.
///
/// ## Line names
/// ```text
/// Att bli till (inkl. 6% moms)
/// Tygkasse (inkl. 25% moms)
/// Inom Sverige (inkl. 6% moms)
/// Utanför Europa (momsfri export)
/// ```
pub fn build_checkout_payload(
    items: &[LineItem],
    shipping: &ShippingSelection,
    pricing: &OrderPricingResult,
    request: &CheckoutRequest,
    settings: &CheckoutSettings,
    config: &PricingConfig,
) -> CoreResult<CheckoutPayload> {
    validate_cart(items)?;

    let order_items = order_items(items, config);
    let mut line_items: Vec<GatewayLineItem> = order_items
        .iter()
        .zip(items)
        .map(|(order_item, item)| GatewayLineItem {
            name: format!(
                "{} (inkl. {} moms)",
                order_item.title,
                config.rates.rate_for(item.tax_category)
            ),
            unit_amount: order_item.unit_price_inc_tax,
            quantity: order_item.quantity,
        })
        .collect();

    let shipping_name = if pricing.shipping.rate.is_zero() {
        format!("{} (momsfri export)", shipping.name)
    } else {
        format!("{} (inkl. {} moms)", shipping.name, pricing.shipping.rate)
    };
    line_items.push(GatewayLineItem {
        name: shipping_name,
        unit_amount: pricing.shipping.bucket.inc_tax(),
        quantity: 1,
    });

    Ok(CheckoutPayload {
        currency: settings.currency.clone(),
        locale: settings.locale.clone(),
        success_url: settings.success_url.clone(),
        cancel_url: settings.cancel_url.clone(),
        allowed_countries: settings.allowed_countries.clone(),
        require_billing_address: settings.require_billing_address,
        customer_email: request.known_email().map(str::to_string),
        line_items,
        amount_total: pricing.total.inc_tax,
        metadata: CheckoutMetadata {
            order_items,
            shipping: ShippingMetadata::new(shipping, &pricing.shipping),
            discount_code: request.discount_code(),
            discount_amount: pricing.products.discount,
            pricing: pricing.clone(),
            newsletter_opt_in: request.newsletter_opt_in,
        },
    })
}

/// Builds the pending order recorded before the customer is sent to pay.
pub fn build_pending_order(
    items: &[LineItem],
    shipping: &ShippingSelection,
    pricing: &OrderPricingResult,
    request: &CheckoutRequest,
    config: &PricingConfig,
) -> NewOrder {
    NewOrder {
        session_id: None,
        user_id: request.user_id.clone(),
        email: request
            .known_email()
            .unwrap_or(PENDING_EMAIL_FALLBACK)
            .to_string(),
        total_amount: pricing.total.inc_tax,
        discount_amount: pricing.products.discount,
        discount_code: request.discount_code(),
        items: order_items(items, config),
        shipping: Some(ShippingMetadata::new(shipping, &pricing.shipping)),
        pricing: Some(pricing.clone()),
        newsletter_opt_in: request.newsletter_opt_in,
        status: OrderStatus::Pending,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
