//! # Domain Types
//!
//! Catalog and cart types used throughout Kassa.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌───────────────────┐     │
//! │  │    Product      │   │    LineItem     │   │ ShippingSelection │     │
//! │  │  ─────────────  │   │  ─────────────  │   │  ───────────────  │     │
//! │  │  id (UUID)      │──►│  product_id     │   │  option_id        │     │
//! │  │  price (ex)     │   │  unit_price_ex  │   │  region           │     │
//! │  │  tax_category   │   │  quantity       │   │  price (gross)    │     │
//! │  └─────────────────┘   └─────────────────┘   └───────────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   TaxCategory   │   │ ShippingRegion  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Book           │   │  Domestic       │       │
//! │  │  600 = 6%       │   │  Merchandise    │   │  Eu / NonEu     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tax-exclusive catalog, tax-inclusive shipping
//! Product prices are stored ex. moms and grossed up when priced. Shipping
//! prices are entered the way customers see them, inclusive of tax; the tax
//! portion is backed out once the cart composition is known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 600 bps = 6% (Swedish moms on books), 2500 bps = 25% (standard rate)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        TaxRate(percent * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate (export outside the EU).
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// `6%`, `25%`, or `12,5%` for fractional rates.
impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{},{}%", whole, frac / 10)
        } else {
            write!(f, "{},{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// Tax Category
// =============================================================================

/// What kind of goods a product is, for VAT purposes.
///
/// Unknown strings fail to deserialize. Legacy rows without a category are
/// modelled as `Option::None` at the use site, never as a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TaxCategory {
    /// Books and other printed matter (reduced rate).
    Book,
    /// Everything else (standard rate).
    Merchandise,
}

impl TaxCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaxCategory::Book => "book",
            TaxCategory::Merchandise => "merchandise",
        }
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(TaxCategory::Book),
            "merchandise" => Ok(TaxCategory::Merchandise),
            other => Err(format!("unknown tax category '{}'", other)),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the shop catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display title shown in the shop and on the order.
    pub title: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Current (possibly sale) price, ex. moms.
    pub price: Money,

    /// List price ex. moms, shown struck through during a sale.
    pub original_price: Option<Money>,

    /// VAT category. `None` only for rows created before categories existed.
    pub tax_category: Option<TaxCategory>,

    /// When set, `price` is the sale price customers pay.
    pub discount_active: bool,

    /// Out-of-stock products are hidden from the shop.
    pub in_stock: bool,

    /// Display order in the catalog.
    pub sort_order: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The ex. moms price the customer is charged right now.
    ///
    /// `price` while a sale is running, otherwise the list price
    /// (falling back to `price` when no list price is recorded).
    pub fn effective_price(&self) -> Money {
        if self.discount_active {
            self.price
        } else {
            self.original_price.unwrap_or(self.price)
        }
    }
}

/// Input for creating a catalog product. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub original_price: Option<Money>,
    /// Required for new products; see [`crate::validation::validate_new_product`].
    pub tax_category: Option<TaxCategory>,
    #[serde(default)]
    pub discount_active: bool,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub sort_order: i64,
}

fn default_in_stock() -> bool {
    true
}

// =============================================================================
// Line Item
// =============================================================================

/// One product line in a cart.
///
/// The price is frozen when the product is added, so a catalog edit does not
/// silently reprice a cart the customer is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    pub title: String,
    /// Unit price ex. moms at the time the item was added.
    pub unit_price_ex_tax: Money,
    pub quantity: i64,
    /// Missing on carts saved before categories existed.
    #[serde(default)]
    pub tax_category: Option<TaxCategory>,
}

impl LineItem {
    /// Creates a line from a catalog product, capturing its effective price.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        LineItem {
            product_id: product.id.clone(),
            title: product.title.clone(),
            unit_price_ex_tax: product.effective_price(),
            quantity,
            tax_category: product.tax_category,
        }
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Where an order ships to. Decides whether shipping carries VAT at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum ShippingRegion {
    /// Within Sweden. Older orders stored this as `sweden`.
    #[serde(alias = "sweden")]
    Domestic,
    /// Elsewhere in the EU.
    Eu,
    /// Outside the EU: export, no Swedish VAT.
    NonEu,
}

impl ShippingRegion {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ShippingRegion::Domestic => "domestic",
            ShippingRegion::Eu => "eu",
            ShippingRegion::NonEu => "non-eu",
        }
    }
}

impl fmt::Display for ShippingRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domestic" | "sweden" => Ok(ShippingRegion::Domestic),
            "eu" => Ok(ShippingRegion::Eu),
            "non-eu" => Ok(ShippingRegion::NonEu),
            other => Err(format!("unknown shipping region '{}'", other)),
        }
    }
}

/// A configured shipping option offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingOption {
    pub id: String,
    pub name: String,
    pub region: ShippingRegion,
    /// Price as shown to the customer, moms included.
    pub price: Money,
}

impl ShippingOption {
    /// The selection a customer makes by picking this option.
    pub fn selection(&self) -> ShippingSelection {
        ShippingSelection {
            option_id: self.id.clone(),
            name: self.name.clone(),
            region: self.region,
            price: self.price,
        }
    }
}

/// The shipping option chosen for a cart.
///
/// The tax rate is not stored here. It is derived from the cart composition
/// when the cart is priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingSelection {
    pub option_id: String,
    pub name: String,
    pub region: ShippingRegion,
    /// Gross price, moms included.
    pub price: Money,
}

// =============================================================================
// Discount Code
// =============================================================================

/// A discount code and the percentage it takes off the products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountCode {
    pub code: String,
    pub percent: u8,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64, original: Option<i64>, discount_active: bool) -> Product {
        Product {
            id: "p1".to_string(),
            title: "Att bli till".to_string(),
            description: None,
            price: Money::from_kronor(price),
            original_price: original.map(Money::from_kronor),
            tax_category: Some(TaxCategory::Book),
            discount_active,
            in_stock: true,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_bps(600).to_string(), "6%");
        assert_eq!(TaxRate::from_percent(25).to_string(), "25%");
        assert_eq!(TaxRate::from_bps(1250).to_string(), "12,5%");
        assert_eq!(TaxRate::from_bps(825).to_string(), "8,25%");
        assert_eq!(TaxRate::zero().to_string(), "0%");
    }

    #[test]
    fn test_effective_price() {
        // Sale running: pay the sale price.
        assert_eq!(product(150, Some(200), true).effective_price(), Money::from_kronor(150));
        // No sale: list price wins.
        assert_eq!(product(150, Some(200), false).effective_price(), Money::from_kronor(200));
        // No list price recorded: fall back to price.
        assert_eq!(product(150, None, false).effective_price(), Money::from_kronor(150));
    }

    #[test]
    fn test_line_item_from_product_freezes_price() {
        let p = product(94, None, false);
        let item = LineItem::from_product(&p, 2);
        assert_eq!(item.unit_price_ex_tax, Money::from_kronor(94));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.tax_category, Some(TaxCategory::Book));
    }

    #[test]
    fn test_unknown_category_fails_to_deserialize() {
        let result: Result<TaxCategory, _> = serde_json::from_str("\"food\"");
        assert!(result.is_err());

        let ok: TaxCategory = serde_json::from_str("\"merchandise\"").unwrap();
        assert_eq!(ok, TaxCategory::Merchandise);
    }

    #[test]
    fn test_legacy_line_item_without_category() {
        let json = r#"{"product_id":"p1","title":"Gammal bok","unit_price_ex_tax":9400,"quantity":1}"#;
        let item: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.tax_category, None);
    }

    #[test]
    fn test_shipping_region_accepts_sweden_alias() {
        let region: ShippingRegion = serde_json::from_str("\"sweden\"").unwrap();
        assert_eq!(region, ShippingRegion::Domestic);
        assert_eq!(serde_json::to_string(&ShippingRegion::NonEu).unwrap(), "\"non-eu\"");
        assert_eq!("sweden".parse::<ShippingRegion>().unwrap(), ShippingRegion::Domestic);
        assert!("mars".parse::<ShippingRegion>().is_err());
    }
}
