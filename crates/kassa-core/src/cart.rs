//! # Cart
//!
//! The customer's cart and the lookup tables used to quote it.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Shop Action             Cart Method             State Change           │
//! │  ───────────             ───────────             ────────────           │
//! │                                                                         │
//! │  Köp ─────────────────► add_product() ─────────► push or qty += n      │
//! │                                                                         │
//! │  Change Quantity ─────► update_quantity() ─────► qty = n (0 removes)   │
//! │                                                                         │
//! │  Remove ──────────────► remove_item() ─────────► items.retain(..)      │
//! │                                                                         │
//! │  Empty Cart ──────────► clear() ───────────────► items.clear()         │
//! │                                                                         │
//! │  View Cart ───────────► quote() ───────────────► (read only)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence is the caller's concern: a cart is loaded from and saved to a
//! cart repository around each operation.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{price_cart, OrderPricingResult};
use crate::tax::PricingConfig;
use crate::types::{DiscountCode, LineItem, Product, ShippingOption, ShippingRegion, ShippingSelection};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product increases quantity)
/// - Quantity is 1..=999 (setting it to 0 removes the item)
/// - At most 100 distinct items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Wraps items loaded from storage.
    pub fn from_items(items: Vec<LineItem>) -> Self {
        Cart { items }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<LineItem> {
        self.items
    }

    /// Adds a product or increases its quantity.
    ///
    /// The product's current effective price and category are captured. When
    /// the product is already in the cart its price is refreshed as well.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            let refreshed = LineItem::from_product(product, new_qty);
            *item = refreshed;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(LineItem::from_product(product, quantity));
        Ok(())
    }

    /// Sets the quantity of an item. Zero removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }
        validate_quantity(quantity).map_err(|_| {
            if quantity > MAX_ITEM_QUANTITY {
                CoreError::QuantityTooLarge {
                    requested: quantity,
                    max: MAX_ITEM_QUANTITY,
                }
            } else {
                CoreError::invalid_cart(format!("quantity must be at least 0, got {}", quantity))
            }
        })?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ItemNotInCart(product_id.to_string())),
        }
    }

    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.items.len();
        self.items.retain(|i| i.product_id != product_id);

        if self.items.len() == initial_len {
            Err(CoreError::ItemNotInCart(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of distinct products.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Prices the cart as it stands.
    pub fn quote(
        &self,
        shipping: &ShippingSelection,
        discount_percent: u8,
        config: &PricingConfig,
    ) -> CoreResult<OrderPricingResult> {
        price_cart(&self.items, shipping, discount_percent, config)
    }
}

// =============================================================================
// Discount Catalog
// =============================================================================

/// The discount codes customers can enter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCatalog {
    codes: Vec<DiscountCode>,
}

impl Default for DiscountCatalog {
    fn default() -> Self {
        DiscountCatalog {
            codes: vec![DiscountCode {
                code: "välkommen10".to_string(),
                percent: 10,
            }],
        }
    }
}

impl DiscountCatalog {
    pub fn new(codes: Vec<DiscountCode>) -> Self {
        DiscountCatalog { codes }
    }

    pub fn codes(&self) -> &[DiscountCode] {
        &self.codes
    }

    /// Looks up a code, ignoring case and surrounding whitespace.
    ///
    /// ```rust
    /// use kassa_core::cart::DiscountCatalog;
    ///
    /// let catalog = DiscountCatalog::default();
    /// assert_eq!(catalog.resolve("  VÄLKOMMEN10 "), Some(10));
    /// assert_eq!(catalog.resolve("gratis"), None);
    /// ```
    pub fn resolve(&self, code: &str) -> Option<u8> {
        let wanted = code.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.codes
            .iter()
            .find(|c| c.code.trim().to_lowercase() == wanted)
            .map(|c| c.percent)
    }
}

// =============================================================================
// Shipping Catalog
// =============================================================================

/// The shipping options offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingCatalog {
    options: Vec<ShippingOption>,
}

impl Default for ShippingCatalog {
    fn default() -> Self {
        ShippingCatalog {
            options: vec![
                ShippingOption {
                    id: "sweden".to_string(),
                    name: "Inom Sverige".to_string(),
                    region: ShippingRegion::Domestic,
                    price: Money::from_kronor(39),
                },
                ShippingOption {
                    id: "europe".to_string(),
                    name: "Europa (utanför Sverige)".to_string(),
                    region: ShippingRegion::Eu,
                    price: Money::from_kronor(100),
                },
                ShippingOption {
                    id: "world".to_string(),
                    name: "Utanför Europa".to_string(),
                    region: ShippingRegion::NonEu,
                    price: Money::from_kronor(100),
                },
            ],
        }
    }
}

impl ShippingCatalog {
    pub fn new(options: Vec<ShippingOption>) -> Self {
        ShippingCatalog { options }
    }

    pub fn options(&self) -> &[ShippingOption] {
        &self.options
    }

    /// Selects an option by id.
    pub fn select(&self, option_id: &str) -> CoreResult<ShippingSelection> {
        self.options
            .iter()
            .find(|o| o.id == option_id)
            .map(ShippingOption::selection)
            .ok_or_else(|| CoreError::UnknownShippingOption(option_id.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
