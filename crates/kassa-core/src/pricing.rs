//! # Cart Pricing
//!
//! Turns a cart into a VAT-correct, rounding-consistent breakdown.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineItem (ex. moms)                                                    │
//! │     │  rate_for(category)                                               │
//! │     ▼                                                                   │
//! │  unit_gross = round(unit_ex × (1 + r))        ← what the customer sees  │
//! │  line_gross = unit_gross × qty                                          │
//! │  line_ex    = round(line_gross / (1 + r))                               │
//! │  line_tax   = line_gross − line_ex                                      │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  per-rate buckets ──► products aggregate ──► discount on the aggregate  │
//! │                                                  │                      │
//! │  shipping (gross, rate from cart composition) ───┤                      │
//! │                                                  ▼                      │
//! │                              total, rounded to the cash unit            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The result is computed once at checkout, stored with the order and never
//! recomputed for that order.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::{shipping_rate, PricingConfig};
use crate::types::{LineItem, ShippingSelection, TaxRate};
use crate::{MAX_ITEM_QUANTITY, MAX_UNIT_PRICE_ORE};

// =============================================================================
// Breakdown Types
// =============================================================================

/// An ex-tax / tax / inc-tax triple.
///
/// `inc_tax == ex_tax + tax` always holds: the only constructors derive one
/// field from the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdownBucket {
    ex_tax: Money,
    tax: Money,
    inc_tax: Money,
}

impl TaxBreakdownBucket {
    pub const fn zero() -> Self {
        TaxBreakdownBucket {
            ex_tax: Money::zero(),
            tax: Money::zero(),
            inc_tax: Money::zero(),
        }
    }

    /// Splits a gross amount at `rate`. A zero rate carries no tax and the
    /// gross amount passes through unrounded.
    pub fn from_gross(gross: Money, rate: TaxRate, unit: i64) -> Self {
        if rate.is_zero() {
            return Self::from_gross_and_net(gross, gross);
        }
        Self::from_gross_and_net(gross, gross.to_net(rate, unit))
    }

    /// Builds a bucket from a gross amount and its ex-tax part.
    pub fn from_gross_and_net(inc_tax: Money, ex_tax: Money) -> Self {
        TaxBreakdownBucket {
            ex_tax,
            tax: inc_tax - ex_tax,
            inc_tax,
        }
    }

    #[inline]
    pub fn ex_tax(&self) -> Money {
        self.ex_tax
    }

    #[inline]
    pub fn tax(&self) -> Money {
        self.tax
    }

    #[inline]
    pub fn inc_tax(&self) -> Money {
        self.inc_tax
    }
}

impl Add for TaxBreakdownBucket {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        TaxBreakdownBucket {
            ex_tax: self.ex_tax + other.ex_tax,
            tax: self.tax + other.tax,
            inc_tax: self.inc_tax + other.inc_tax,
        }
    }
}

impl AddAssign for TaxBreakdownBucket {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Products at one VAT rate, before any discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RateBreakdown {
    pub rate: TaxRate,
    pub bucket: TaxBreakdownBucket,
}

/// All products after the discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductsBreakdown {
    pub bucket: TaxBreakdownBucket,
    /// Products gross before the discount.
    pub original_inc_tax: Money,
    /// Amount taken off the products gross.
    pub discount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingBreakdown {
    pub bucket: TaxBreakdownBucket,
    /// Derived from cart composition and region.
    pub rate: TaxRate,
}

/// The payable amount. `inc_tax` is rounded to the cash unit; the difference
/// to `ex_tax + tax` is `rounding_adjustment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TotalBreakdown {
    pub ex_tax: Money,
    pub tax: Money,
    pub inc_tax: Money,
    pub rounding_adjustment: Money,
}

/// Full pricing breakdown of a cart.
///
/// ## Invariants
/// - `total.inc_tax` is a multiple of the cash-rounding unit
/// - `total.inc_tax == products.inc_tax + shipping.inc_tax + rounding_adjustment`
/// - without a discount, `rates` sums to `products`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderPricingResult {
    /// One entry per configured rate, reduced first. Pre-discount.
    pub rates: Vec<RateBreakdown>,
    pub products: ProductsBreakdown,
    pub shipping: ShippingBreakdown,
    pub discount_percent: u8,
    pub total: TotalBreakdown,
}

impl OrderPricingResult {
    /// Pre-discount bucket for a rate, if that rate is configured.
    pub fn rate_bucket(&self, rate: TaxRate) -> Option<&TaxBreakdownBucket> {
        self.rates.iter().find(|r| r.rate == rate).map(|r| &r.bucket)
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Prices a cart.
///
/// ## User Workflow
/// ```text
/// Customer opens the cart
///      │
///      ▼
/// price_cart(items, shipping, discount %) ← THIS FUNCTION
///      │
///      ├── quantity < 1 / negative price → InvalidCartState
///      ├── discount > 100                → InvalidDiscount
///      │
///      ▼
/// OrderPricingResult shown in the cart, sent to the gateway, stored on the order
/// ```
///
/// An empty cart is priced (zero products, shipping only); refusing to check
/// out an empty cart is [`crate::checkout::validate_cart`]'s job.
///
/// ## Example
/// ```rust
/// use kassa_core::money::Money;
/// use kassa_core::pricing::price_cart;
/// use kassa_core::tax::PricingConfig;
/// use kassa_core::types::{LineItem, ShippingRegion, ShippingSelection, TaxCategory};
///
/// let items = vec![LineItem {
///     product_id: "p1".into(),
///     title: "Att bli till".into(),
///     unit_price_ex_tax: Money::from_kronor(94),
///     quantity: 1,
///     tax_category: Some(TaxCategory::Book),
/// }];
/// let shipping = ShippingSelection {
///     option_id: "sweden".into(),
///     name: "Inom Sverige".into(),
///     region: ShippingRegion::Domestic,
///     price: Money::from_kronor(39),
/// };
///
/// let pricing = price_cart(&items, &shipping, 0, &PricingConfig::default()).unwrap();
/// assert_eq!(pricing.total.inc_tax, Money::from_kronor(139));
/// ```
pub fn price_cart(
    items: &[LineItem],
    shipping: &ShippingSelection,
    discount_percent: u8,
    config: &PricingConfig,
) -> CoreResult<OrderPricingResult> {
    if discount_percent > 100 {
        return Err(CoreError::InvalidDiscount {
            percent: discount_percent as u32,
        });
    }
    validate_lines(items)?;
    if shipping.price.is_negative() {
        return Err(CoreError::invalid_cart("shipping price cannot be negative"));
    }

    let unit = config.rounding.unit;
    let rates = &config.rates;

    let mut per_rate: Vec<RateBreakdown> = rates
        .all()
        .into_iter()
        .map(|rate| RateBreakdown {
            rate,
            bucket: TaxBreakdownBucket::zero(),
        })
        .collect();
    let mut products = TaxBreakdownBucket::zero();

    for item in items {
        let rate = rates.rate_for(item.tax_category);
        let unit_gross = item.unit_price_ex_tax.to_gross(rate, unit);
        let line_gross = unit_gross
            .checked_mul(item.quantity)
            .and_then(|gross| gross.checked_add(products.inc_tax()).map(|_| gross))
            .ok_or_else(|| {
                CoreError::invalid_cart(format!("line total for '{}' overflows", item.title))
            })?;
        let line = TaxBreakdownBucket::from_gross(line_gross, rate, unit);

        if let Some(slot) = per_rate.iter_mut().find(|r| r.rate == rate) {
            slot.bucket += line;
        }
        products += line;
    }

    let discount = products.inc_tax().percentage(discount_percent, unit);
    let discounted = if discount.is_zero() {
        products
    } else {
        let ex_share = products
            .ex_tax()
            .proportion(discount, products.inc_tax(), unit);
        TaxBreakdownBucket::from_gross_and_net(
            products.inc_tax() - discount,
            products.ex_tax() - ex_share,
        )
    };

    let ship_rate = shipping_rate(items, shipping.region, rates);
    let ship = TaxBreakdownBucket::from_gross(shipping.price, ship_rate, unit);

    let ex_tax = discounted.ex_tax() + ship.ex_tax();
    let tax = discounted.tax() + ship.tax();
    let raw = ex_tax + tax;
    let inc_tax = raw.round_to(config.rounding.cash_unit);

    Ok(OrderPricingResult {
        rates: per_rate,
        products: ProductsBreakdown {
            bucket: discounted,
            original_inc_tax: products.inc_tax(),
            discount,
        },
        shipping: ShippingBreakdown {
            bucket: ship,
            rate: ship_rate,
        },
        discount_percent,
        total: TotalBreakdown {
            ex_tax,
            tax,
            inc_tax,
            rounding_adjustment: inc_tax - raw,
        },
    })
}

/// Rejects lines that cannot be priced.
pub(crate) fn validate_lines(items: &[LineItem]) -> CoreResult<()> {
    for item in items {
        if item.quantity < 1 {
            return Err(CoreError::invalid_cart(format!(
                "quantity for '{}' must be at least 1, got {}",
                item.title, item.quantity
            )));
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: item.quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        if item.unit_price_ex_tax.is_negative() {
            return Err(CoreError::invalid_cart(format!(
                "price for '{}' cannot be negative",
                item.title
            )));
        }
        if item.unit_price_ex_tax.ore() > MAX_UNIT_PRICE_ORE {
            return Err(CoreError::invalid_cart(format!(
                "price for '{}' exceeds {}",
                item.title,
                Money::from_ore(MAX_UNIT_PRICE_ORE)
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::{RoundingPolicy, VatRates};
    use crate::types::{ShippingRegion, TaxCategory};
    use proptest::prelude::*;

    fn one_unit() -> PricingConfig {
        PricingConfig {
            rates: VatRates::default(),
            rounding: RoundingPolicy::ore(),
        }
    }

    fn item(id: &str, ex: i64, qty: i64, category: Option<TaxCategory>) -> LineItem {
        LineItem {
            product_id: id.to_string(),
            title: id.to_string(),
            unit_price_ex_tax: Money::from_ore(ex),
            quantity: qty,
            tax_category: category,
        }
    }

    fn shipping(region: ShippingRegion, gross: i64) -> ShippingSelection {
        ShippingSelection {
            option_id: region.as_str().to_string(),
            name: "Frakt".to_string(),
            region,
            price: Money::from_ore(gross),
        }
    }

    #[test]
    fn test_end_to_end_single_book_domestic() {
        let items = [item("book", 94, 1, Some(TaxCategory::Book))];
        let result = price_cart(&items, &shipping(ShippingRegion::Domestic, 39), 0, &one_unit()).unwrap();

        assert_eq!(result.products.bucket.inc_tax().ore(), 100);
        assert_eq!(result.products.bucket.ex_tax().ore(), 94);
        assert_eq!(result.products.bucket.tax().ore(), 6);

        assert_eq!(result.shipping.rate.bps(), 600);
        assert_eq!(result.shipping.bucket.inc_tax().ore(), 39);
        assert_eq!(result.shipping.bucket.ex_tax().ore(), 37);
        assert_eq!(result.shipping.bucket.tax().ore(), 2);

        assert_eq!(result.total.inc_tax.ore(), 139);
        assert_eq!(result.total.ex_tax.ore(), 131);
        assert_eq!(result.total.tax.ore(), 8);
        assert!(result.total.rounding_adjustment.is_zero());
    }

    #[test]
    fn test_end_to_end_krona_policy() {
        let items = [item("book", 9400, 1, Some(TaxCategory::Book))];
        let result = price_cart(
            &items,
            &shipping(ShippingRegion::Domestic, 3900),
            0,
            &PricingConfig::default(),
        )
        .unwrap();

        assert_eq!(result.products.bucket.inc_tax().ore(), 10_000);
        assert_eq!(result.products.bucket.ex_tax().ore(), 9_400);
        assert_eq!(result.shipping.bucket.ex_tax().ore(), 3_700);
        assert_eq!(result.shipping.bucket.tax().ore(), 200);
        assert_eq!(result.total.inc_tax.ore(), 13_900);
        assert!(result.total.rounding_adjustment.is_zero());
    }

    #[test]
    fn test_cash_rounding_adjustment() {
        let config = PricingConfig {
            rates: VatRates::default(),
            rounding: RoundingPolicy { unit: 1, cash_unit: 100 },
        };
        let items = [item("book", 9400, 1, Some(TaxCategory::Book))];
        let result = price_cart(&items, &shipping(ShippingRegion::Domestic, 3900), 0, &config).unwrap();

        assert_eq!(result.products.bucket.inc_tax().ore(), 9_964);
        assert_eq!(result.total.inc_tax.ore(), 13_900);
        assert_eq!(result.total.rounding_adjustment.ore(), 36);
        assert_eq!(
            result.total.inc_tax,
            result.products.bucket.inc_tax()
                + result.shipping.bucket.inc_tax()
                + result.total.rounding_adjustment
        );
    }

    #[test]
    fn test_mixed_cart_rate_buckets() {
        let items = [
            item("book", 200, 2, Some(TaxCategory::Book)),
            item("tote", 200, 1, Some(TaxCategory::Merchandise)),
        ];
        let result = price_cart(&items, &shipping(ShippingRegion::Domestic, 39), 0, &one_unit()).unwrap();

        let reduced = result.rate_bucket(TaxRate::from_bps(600)).unwrap();
        let standard = result.rate_bucket(TaxRate::from_bps(2500)).unwrap();
        // 200 × 1.06 = 212 per book
        assert_eq!(reduced.inc_tax().ore(), 424);
        assert_eq!(reduced.ex_tax().ore(), 400);
        // 200 × 1.25 = 250
        assert_eq!(standard.inc_tax().ore(), 250);
        assert_eq!(standard.tax().ore(), 50);
        assert_eq!(*reduced + *standard, result.products.bucket);
        // two books vs one tote: reduced shipping
        assert_eq!(result.shipping.rate.bps(), 600);
    }

    #[test]
    fn test_shipping_tie_break_uses_reduced_rate() {
        let items = [
            item("book", 100, 1, Some(TaxCategory::Book)),
            item("tote", 100, 1, Some(TaxCategory::Merchandise)),
        ];
        let result = price_cart(&items, &shipping(ShippingRegion::Eu, 100), 0, &one_unit()).unwrap();
        assert_eq!(result.shipping.rate.bps(), 600);
    }

    #[test]
    fn test_non_eu_shipping_is_exempt() {
        let items = [item("tote", 200, 1, Some(TaxCategory::Merchandise))];
        let result = price_cart(&items, &shipping(ShippingRegion::NonEu, 100), 0, &one_unit()).unwrap();

        assert!(result.shipping.rate.is_zero());
        assert!(result.shipping.bucket.tax().is_zero());
        assert_eq!(result.shipping.bucket.ex_tax().ore(), 100);
        // Products keep their own tax even when exported.
        assert_eq!(result.products.bucket.tax().ore(), 50);
    }

    #[test]
    fn test_discount_proportionality() {
        // 943 ex → 999.58 → 1000 gross at one-unit rounding
        let items = [item("book", 943, 1, Some(TaxCategory::Book))];
        let result = price_cart(&items, &shipping(ShippingRegion::NonEu, 0), 10, &one_unit()).unwrap();

        assert_eq!(result.products.original_inc_tax.ore(), 1000);
        assert_eq!(result.products.discount.ore(), 100);
        assert_eq!(result.products.bucket.inc_tax().ore(), 900);
        // pre-discount ex = round(1000 / 1.06) = 943; 943 − round(943/1000 × 100) = 849
        assert_eq!(result.products.bucket.ex_tax().ore(), 849);
        assert_eq!(result.products.bucket.tax().ore(), 51);
        assert_eq!(result.discount_percent, 10);

        // Per-rate buckets keep the pre-discount composition.
        let reduced = result.rate_bucket(TaxRate::from_bps(600)).unwrap();
        assert_eq!(reduced.inc_tax().ore(), 1000);
    }

    #[test]
    fn test_zero_discount_fields_present() {
        let items = [item("book", 94, 1, None)];
        let result = price_cart(&items, &shipping(ShippingRegion::Domestic, 39), 0, &one_unit()).unwrap();
        assert!(result.products.discount.is_zero());
        assert_eq!(result.products.original_inc_tax, result.products.bucket.inc_tax());
    }

    #[test]
    fn test_legacy_item_taxed_as_book() {
        let items = [item("old", 94, 1, None)];
        let result = price_cart(&items, &shipping(ShippingRegion::Domestic, 0), 0, &one_unit()).unwrap();
        let reduced = result.rate_bucket(TaxRate::from_bps(600)).unwrap();
        assert_eq!(reduced.inc_tax().ore(), 100);
        let standard = result.rate_bucket(TaxRate::from_bps(2500)).unwrap();
        assert!(standard.inc_tax().is_zero());
    }

    #[test]
    fn test_empty_cart_prices_shipping_only() {
        let result = price_cart(&[], &shipping(ShippingRegion::Domestic, 39), 0, &one_unit()).unwrap();
        assert_eq!(result.products.bucket, TaxBreakdownBucket::zero());
        assert_eq!(result.rates.len(), 2);
        assert_eq!(result.shipping.rate.bps(), 600);
        assert_eq!(result.total.inc_tax.ore(), 39);
    }

    #[test]
    fn test_rejects_malformed_input() {
        let ship = shipping(ShippingRegion::Domestic, 39);
        let zero_qty = [item("book", 94, 0, None)];
        assert!(matches!(
            price_cart(&zero_qty, &ship, 0, &one_unit()),
            Err(CoreError::InvalidCartState { .. })
        ));

        let negative = [item("book", -1, 1, None)];
        assert!(matches!(
            price_cart(&negative, &ship, 0, &one_unit()),
            Err(CoreError::InvalidCartState { .. })
        ));

        let ok = [item("book", 94, 1, None)];
        assert!(matches!(
            price_cart(&ok, &ship, 101, &one_unit()),
            Err(CoreError::InvalidDiscount { percent: 101 })
        ));
    }

    #[test]
    fn test_huge_quantity_is_rejected_not_overflowed() {
        let ship = shipping(ShippingRegion::Domestic, 3900);
        let huge = [item("book", 10_000, 1_000_000_000_000_000, Some(TaxCategory::Book))];
        assert!(matches!(
            price_cart(&huge, &ship, 0, &PricingConfig::default()),
            Err(CoreError::QuantityTooLarge {
                requested: 1_000_000_000_000_000,
                max: MAX_ITEM_QUANTITY,
            })
        ));

        let at_cap = [item("book", 10_000, MAX_ITEM_QUANTITY, Some(TaxCategory::Book))];
        assert!(price_cart(&at_cap, &ship, 0, &PricingConfig::default()).is_ok());
    }

    #[test]
    fn test_price_above_ceiling_is_rejected() {
        let ship = shipping(ShippingRegion::Domestic, 3900);
        let pricey = [item("book", i64::MAX / 2, 1, Some(TaxCategory::Book))];
        assert!(matches!(
            price_cart(&pricey, &ship, 0, &PricingConfig::default()),
            Err(CoreError::InvalidCartState { .. })
        ));

        let ceiling = [item("art", MAX_UNIT_PRICE_ORE, MAX_ITEM_QUANTITY, None)];
        assert!(price_cart(&ceiling, &ship, 0, &PricingConfig::default()).is_ok());
    }

    #[test]
    fn test_full_discount() {
        let items = [item("book", 94, 2, Some(TaxCategory::Book))];
        let result = price_cart(&items, &shipping(ShippingRegion::Domestic, 39), 100, &one_unit()).unwrap();
        assert!(result.products.bucket.inc_tax().is_zero());
        assert!(result.products.bucket.ex_tax().is_zero());
        assert_eq!(result.total.inc_tax.ore(), 39);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn arb_item() -> impl Strategy<Value = LineItem> {
        (
            0i64..200_000,
            1i64..20,
            prop_oneof![
                Just(None),
                Just(Some(TaxCategory::Book)),
                Just(Some(TaxCategory::Merchandise))
            ],
        )
            .prop_map(|(ex, qty, category)| LineItem {
                product_id: format!("p-{}-{}", ex, qty),
                title: "x".to_string(),
                unit_price_ex_tax: Money::from_ore(ex),
                quantity: qty,
                tax_category: category,
            })
    }

    fn arb_region() -> impl Strategy<Value = ShippingRegion> {
        prop_oneof![
            Just(ShippingRegion::Domestic),
            Just(ShippingRegion::Eu),
            Just(ShippingRegion::NonEu)
        ]
    }

    fn arb_config() -> impl Strategy<Value = PricingConfig> {
        (prop_oneof![Just(1i64), Just(100)], prop_oneof![Just(1i64), Just(100)]).prop_map(
            |(unit, cash_unit)| PricingConfig {
                rates: VatRates::default(),
                rounding: RoundingPolicy { unit, cash_unit },
            },
        )
    }

    fn assert_reconciles(bucket: &TaxBreakdownBucket) -> Result<(), TestCaseError> {
        prop_assert_eq!(bucket.inc_tax(), bucket.ex_tax() + bucket.tax());
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_every_bucket_reconciles(
            items in prop::collection::vec(arb_item(), 0..8),
            region in arb_region(),
            ship in 0i64..20_000,
            pct in 0u8..=100,
            config in arb_config(),
        ) {
            let result = price_cart(&items, &shipping(region, ship), pct, &config).unwrap();
            for rate in &result.rates {
                assert_reconciles(&rate.bucket)?;
            }
            assert_reconciles(&result.products.bucket)?;
            assert_reconciles(&result.shipping.bucket)?;
            prop_assert_eq!(
                result.products.bucket.inc_tax(),
                result.products.original_inc_tax - result.products.discount
            );
        }

        #[test]
        fn prop_total_consistency(
            items in prop::collection::vec(arb_item(), 0..8),
            region in arb_region(),
            ship in 0i64..20_000,
            pct in 0u8..=100,
            config in arb_config(),
        ) {
            let result = price_cart(&items, &shipping(region, ship), pct, &config).unwrap();
            prop_assert_eq!(
                result.total.inc_tax,
                result.products.bucket.inc_tax()
                    + result.shipping.bucket.inc_tax()
                    + result.total.rounding_adjustment
            );
            prop_assert_eq!(result.total.inc_tax.ore() % config.rounding.cash_unit, 0);
            prop_assert!(result.total.rounding_adjustment.abs().ore() * 2 <= config.rounding.cash_unit);
        }

        #[test]
        fn prop_rate_buckets_sum_to_products_without_discount(
            items in prop::collection::vec(arb_item(), 0..8),
            region in arb_region(),
            config in arb_config(),
        ) {
            let result = price_cart(&items, &shipping(region, 0), 0, &config).unwrap();
            let sum = result
                .rates
                .iter()
                .fold(TaxBreakdownBucket::zero(), |acc, r| acc + r.bucket);
            prop_assert_eq!(sum, result.products.bucket);
        }
    }
}
