//! # Accounting Reconciliation
//!
//! Projects settled orders into bookkeeping rows: VAT per rate, the
//! processor's fee and the net payout.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order (completed)                                                      │
//! │     │                                                                   │
//! │     ├── items:    gross = unit_inc × qty, ex = round(gross / (1 + r))   │
//! │     │             accumulated into the reduced / standard column        │
//! │     ├── discount: aggregate method, tax re-apportioned per column       │
//! │     ├── shipping: backed out at the stored rate (0 → no tax)            │
//! │     └── fee:      FeeMap[transaction_id] or 0 + "pending"               │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  AccountingRow ──► build_ledger() sums ──► AccountingTotals             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are read-time projections. They are recomputed on every export and
//! never stored. Orders are booked on their Stockholm calendar date.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Europe::Stockholm;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::{Order, OrderStatus};
use crate::pricing::TaxBreakdownBucket;
use crate::tax::VatRates;

/// Processor fees by transaction id.
pub type FeeMap = HashMap<String, Money>;

// =============================================================================
// Date Range
// =============================================================================

/// The calendar date an order is booked on: its Stockholm local date.
///
/// ```rust
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use kassa_core::accounting::booking_date;
///
/// // 00:30 CEST on 1 April
/// let at = Utc.with_ymd_and_hms(2024, 3, 31, 22, 30, 0).unwrap();
/// assert_eq!(booking_date(&at), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
/// ```
pub fn booking_date(at: &DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Stockholm).date_naive()
}

/// Inclusive range of booking dates (Stockholm local). Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateRange {
    /// Fails when `from` is after `to`.
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> CoreResult<Self> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ValidationError::InvalidFormat {
                    field: "date range".to_string(),
                    reason: format!("{} is after {}", f, t),
                }
                .into());
            }
        }
        Ok(DateRange { from, to })
    }

    /// Every date.
    pub const fn all() -> Self {
        DateRange {
            from: None,
            to: None,
        }
    }

    pub fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn to(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        let date = booking_date(at);
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}

// =============================================================================
// Rows
// =============================================================================

/// Whether the processor fee for a row is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Settled,
    /// Fee lookup failed or has not happened; the fee column reads zero.
    Pending,
}

/// One settled order as the bookkeeper sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountingRow {
    pub order_id: String,
    pub order_number: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub customer: String,
    /// `Att bli till (2st), Tygkasse (1st)`
    pub products: String,
    pub amount_ex_tax: Money,
    pub reduced_tax: Money,
    pub standard_tax: Money,
    pub total_tax: Money,
    /// The settled charge.
    pub amount_inc_tax: Money,
    pub processor_fee: Money,
    pub fee_status: FeeStatus,
    pub net_payout: Money,
}

/// Column sums of a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccountingTotals {
    pub amount_ex_tax: Money,
    pub reduced_tax: Money,
    pub standard_tax: Money,
    pub total_tax: Money,
    pub amount_inc_tax: Money,
    pub processor_fee: Money,
    pub net_payout: Money,
    /// Rows whose fee is still pending.
    pub fees_pending: usize,
}

impl AccountingTotals {
    fn add_row(&mut self, row: &AccountingRow) {
        self.amount_ex_tax += row.amount_ex_tax;
        self.reduced_tax += row.reduced_tax;
        self.standard_tax += row.standard_tax;
        self.total_tax += row.total_tax;
        self.amount_inc_tax += row.amount_inc_tax;
        self.processor_fee += row.processor_fee;
        self.net_payout += row.net_payout;
        if row.fee_status == FeeStatus::Pending {
            self.fees_pending += 1;
        }
    }
}

/// Rows plus their totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Ledger {
    pub rows: Vec<AccountingRow>,
    pub totals: AccountingTotals,
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Reconciles one settled order against the processor's fee.
///
/// `unit` is the rounding unit the order was priced with. Fails when a stored
/// line total does not fit in `i64` öre.
pub fn reconcile_order(
    order: &Order,
    fees: &FeeMap,
    rates: &VatRates,
    unit: i64,
) -> CoreResult<AccountingRow> {
    let mut reduced = TaxBreakdownBucket::zero();
    let mut standard = TaxBreakdownBucket::zero();
    let mut gross = Money::zero();

    for item in &order.items {
        let rate = rates.rate_for(item.tax_category);
        let line_total = item.line_total()?;
        gross = gross.checked_add(line_total).ok_or_else(|| CoreError::InvalidCartState {
            reason: format!("order {} total overflows", order.id),
        })?;
        let line = TaxBreakdownBucket::from_gross(line_total, rate, unit);
        if rate == rates.reduced {
            reduced += line;
        } else {
            standard += line;
        }
    }

    let products = reduced + standard;
    let (products_ex, mut reduced_tax, mut standard_tax) = if order.discount_amount.is_positive() {
        let gross = products.inc_tax();
        let discount = order.discount_amount;
        let ex = products.ex_tax() - products.ex_tax().proportion(discount, gross, unit);
        let tax = (gross - discount) - ex;
        let reduced_share = reduced.tax().proportion(tax, products.tax(), unit);
        (ex, reduced_share, tax - reduced_share)
    } else {
        (products.ex_tax(), reduced.tax(), standard.tax())
    };

    let mut amount_ex_tax = products_ex;
    if let Some(shipping) = &order.shipping {
        let bucket = TaxBreakdownBucket::from_gross(shipping.price_inc_tax, shipping.tax_rate, unit);
        amount_ex_tax += bucket.ex_tax();
        if shipping.tax_rate.is_zero() {
            // export: no tax column
        } else if shipping.tax_rate == rates.reduced {
            reduced_tax += bucket.tax();
        } else {
            if shipping.tax_rate != rates.standard {
                warn!(
                    order_id = %order.id,
                    rate = %shipping.tax_rate,
                    "Shipping rate matches no configured rate, booking under standard"
                );
            }
            standard_tax += bucket.tax();
        }
    }

    let total_tax = reduced_tax + standard_tax;
    let amount_inc_tax = order.total_amount;
    let adjustment = order
        .pricing
        .as_ref()
        .map(|p| p.total.rounding_adjustment)
        .unwrap_or_default();
    let recomputed = amount_ex_tax + total_tax + adjustment;
    if recomputed != amount_inc_tax {
        warn!(
            order_id = %order.id,
            charged = %amount_inc_tax,
            recomputed = %recomputed,
            "Settled amount differs from reconstructed breakdown"
        );
    }

    let (processor_fee, fee_status) = match order
        .transaction_id
        .as_ref()
        .and_then(|id| fees.get(id))
    {
        Some(fee) => (*fee, FeeStatus::Settled),
        None => (Money::zero(), FeeStatus::Pending),
    };

    Ok(AccountingRow {
        order_id: order.id.clone(),
        order_number: order.order_number().to_string(),
        date: booking_date(&order.created_at),
        customer: order.email.clone(),
        products: order
            .items
            .iter()
            .map(|i| format!("{} ({}st)", i.title, i.quantity))
            .collect::<Vec<_>>()
            .join(", "),
        amount_ex_tax,
        reduced_tax,
        standard_tax,
        total_tax,
        amount_inc_tax,
        processor_fee,
        fee_status,
        net_payout: amount_inc_tax - processor_fee,
    })
}

/// Builds the ledger for completed orders inside `range`.
///
/// Orders keep their input order. Totals are exact column sums. An order that
/// cannot be reconciled is left out with a warning.
pub fn build_ledger(
    orders: &[Order],
    fees: &FeeMap,
    range: &DateRange,
    rates: &VatRates,
    unit: i64,
) -> Ledger {
    let mut ledger = Ledger::default();

    for order in orders {
        if order.status != OrderStatus::Completed {
            debug!(order_id = %order.id, status = %order.status, "Skipping unsettled order");
            continue;
        }
        if !range.contains(&order.created_at) {
            continue;
        }
        let row = match reconcile_order(order, fees, rates, unit) {
            Ok(row) => row,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "Leaving unreconcilable order out of ledger");
                continue;
            }
        };
        ledger.totals.add_row(&row);
        ledger.rows.push(row);
    }

    ledger
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{build_pending_order, CheckoutRequest};
    use crate::order::{OrderItem, ShippingMetadata};
    use crate::pricing::price_cart;
    use crate::tax::{PricingConfig, RoundingPolicy};
    use crate::types::{LineItem, ShippingRegion, ShippingSelection, TaxCategory, TaxRate};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn item(title: &str, inc: i64, qty: i64, category: Option<TaxCategory>) -> OrderItem {
        OrderItem {
            product_id: title.to_lowercase(),
            title: title.to_string(),
            unit_price_inc_tax: Money::from_ore(inc),
            quantity: qty,
            tax_category: category,
        }
    }

    fn shipping(inc: i64, ex: i64, rate: u32) -> ShippingMetadata {
        ShippingMetadata {
            option_id: "sweden".to_string(),
            name: "Inom Sverige".to_string(),
            region: ShippingRegion::Domestic,
            price_ex_tax: Money::from_ore(ex),
            tax: Money::from_ore(inc - ex),
            price_inc_tax: Money::from_ore(inc),
            tax_rate: TaxRate::from_bps(rate),
        }
    }

    fn order(id: &str, items: Vec<OrderItem>, ship: Option<ShippingMetadata>, total: i64) -> Order {
        Order {
            id: id.to_string(),
            session_id: Some(format!("cs_{}", id)),
            transaction_id: Some(format!("pi_{}", id)),
            user_id: None,
            email: "kund@example.se".to_string(),
            total_amount: Money::from_ore(total),
            discount_amount: Money::zero(),
            discount_code: None,
            items,
            shipping: ship,
            pricing: None,
            newsletter_opt_in: false,
            status: OrderStatus::Completed,
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 15, 12, 5, 0).unwrap(),
        }
    }

    #[test]
    fn test_reconcile_single_book_with_fee() {
        let o = order(
            "a1b2c3d4-rest",
            vec![item("Att bli till", 100, 1, Some(TaxCategory::Book))],
            Some(shipping(39, 37, 600)),
            139,
        );
        let mut fees = FeeMap::new();
        fees.insert("pi_a1b2c3d4-rest".to_string(), Money::from_ore(5));

        let row = reconcile_order(&o, &fees, &VatRates::default(), 1).unwrap();

        assert_eq!(row.order_number, "a1b2c3d4");
        assert_eq!(row.products, "Att bli till (1st)");
        assert_eq!(row.amount_ex_tax.ore(), 131);
        assert_eq!(row.reduced_tax.ore(), 8);
        assert!(row.standard_tax.is_zero());
        assert_eq!(row.total_tax.ore(), 8);
        assert_eq!(row.amount_inc_tax.ore(), 139);
        assert_eq!(row.processor_fee.ore(), 5);
        assert_eq!(row.fee_status, FeeStatus::Settled);
        assert_eq!(row.net_payout.ore(), 134);
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn test_missing_fee_degrades_to_pending() {
        let o = order(
            "order-1",
            vec![item("Att bli till", 100, 1, Some(TaxCategory::Book))],
            None,
            100,
        );
        let row = reconcile_order(&o, &FeeMap::new(), &VatRates::default(), 1).unwrap();

        assert!(row.processor_fee.is_zero());
        assert_eq!(row.fee_status, FeeStatus::Pending);
        assert_eq!(row.net_payout, row.amount_inc_tax);
    }

    #[test]
    fn test_mixed_categories_split_columns() {
        let o = order(
            "order-2",
            vec![
                item("Att bli till", 212, 2, Some(TaxCategory::Book)),
                item("Tygkasse", 250, 1, Some(TaxCategory::Merchandise)),
            ],
            Some(shipping(100, 80, 2500)),
            774,
        );
        let row = reconcile_order(&o, &FeeMap::new(), &VatRates::default(), 1).unwrap();

        // books: 424 gross → 400 ex, 24 tax; tote: 250 → 200, 50; shipping 100 → 80, 20
        assert_eq!(row.reduced_tax.ore(), 24);
        assert_eq!(row.standard_tax.ore(), 70);
        assert_eq!(row.amount_ex_tax.ore(), 680);
        assert_eq!(row.amount_ex_tax + row.total_tax, row.amount_inc_tax);
        assert_eq!(row.products, "Att bli till (2st), Tygkasse (1st)");
    }

    #[test]
    fn test_legacy_item_without_category_is_reduced() {
        let o = order("order-3", vec![item("Gammal bok", 106, 1, None)], None, 106);
        let row = reconcile_order(&o, &FeeMap::new(), &VatRates::default(), 1).unwrap();
        assert_eq!(row.reduced_tax.ore(), 6);
        assert!(row.standard_tax.is_zero());
    }

    #[test]
    fn test_export_shipping_carries_no_tax() {
        let o = order(
            "order-4",
            vec![item("Tygkasse", 250, 1, Some(TaxCategory::Merchandise))],
            Some(shipping(100, 100, 0)),
            350,
        );
        let row = reconcile_order(&o, &FeeMap::new(), &VatRates::default(), 1).unwrap();
        assert_eq!(row.standard_tax.ore(), 50);
        assert_eq!(row.amount_ex_tax.ore(), 300);
    }

    #[test]
    fn test_discount_tax_columns_sum_to_total() {
        let mut o = order(
            "order-5",
            vec![
                item("Att bli till", 212, 2, Some(TaxCategory::Book)),
                item("Tygkasse", 250, 1, Some(TaxCategory::Merchandise)),
            ],
            None,
            607,
        );
        // 10 % of 674
        o.discount_amount = Money::from_ore(67);
        let row = reconcile_order(&o, &FeeMap::new(), &VatRates::default(), 1).unwrap();

        assert_eq!(row.reduced_tax + row.standard_tax, row.total_tax);
        assert_eq!(row.amount_ex_tax + row.total_tax, Money::from_ore(607));
        // pre-discount ex 600 → 600 − round(600/674 × 67) = 540
        assert_eq!(row.amount_ex_tax.ore(), 540);
    }

    #[test]
    fn test_ledger_keeps_completed_orders_in_range() {
        let book = || vec![item("Att bli till", 100, 1, Some(TaxCategory::Book))];
        let settled = order("settled", book(), None, 100);
        let mut pending = order("pending", book(), None, 100);
        pending.status = OrderStatus::Pending;
        let mut canceled = order("canceled", book(), None, 100);
        canceled.status = OrderStatus::Canceled;
        let mut later = order("later", book(), None, 100);
        later.created_at = Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap();

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 3, 31),
        )
        .unwrap();
        let mut fees = FeeMap::new();
        fees.insert("pi_settled".to_string(), Money::from_ore(3));

        let ledger = build_ledger(
            &[settled, pending, canceled, later],
            &fees,
            &range,
            &VatRates::default(),
            1,
        );

        assert_eq!(ledger.rows.len(), 1);
        assert_eq!(ledger.rows[0].order_id, "settled");
        assert_eq!(ledger.totals.amount_inc_tax.ore(), 100);
        assert_eq!(ledger.totals.processor_fee.ore(), 3);
        assert_eq!(ledger.totals.net_payout.ore(), 97);
        assert_eq!(ledger.totals.fees_pending, 0);
    }

    #[test]
    fn test_ledger_totals_are_exact_sums() {
        let a = order("a", vec![item("A", 106, 3, None)], Some(shipping(39, 37, 600)), 357);
        let b = order("b", vec![item("B", 250, 1, Some(TaxCategory::Merchandise))], None, 250);
        let ledger = build_ledger(&[a, b], &FeeMap::new(), &DateRange::all(), &VatRates::default(), 1);

        let sum = |f: fn(&AccountingRow) -> Money| ledger.rows.iter().map(f).sum::<Money>();
        assert_eq!(ledger.totals.amount_ex_tax, sum(|r| r.amount_ex_tax));
        assert_eq!(ledger.totals.reduced_tax, sum(|r| r.reduced_tax));
        assert_eq!(ledger.totals.standard_tax, sum(|r| r.standard_tax));
        assert_eq!(ledger.totals.total_tax, sum(|r| r.total_tax));
        assert_eq!(ledger.totals.net_payout, sum(|r| r.net_payout));
        assert_eq!(ledger.totals.fees_pending, 2);
    }

    #[test]
    fn test_date_range() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d);
        let range = DateRange::new(day(10), day(15)).unwrap();
        // CET: 22:59:59 UTC is still the 15th, 23:30 UTC is already the 16th
        assert!(range.contains(&Utc.with_ymd_and_hms(2024, 3, 15, 22, 59, 59).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2024, 3, 15, 23, 30, 0).unwrap()));
        assert!(range.contains(&Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()));
        assert!(!range.contains(&Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap()));
        assert!(DateRange::new(day(16), day(15)).is_err());
        assert!(DateRange::new(None, day(1)).unwrap().contains(&Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_booking_date_follows_stockholm() {
        // 00:30 CEST on 1 April is booked in April, not March
        let mut o = order("april", vec![item("Att bli till", 100, 1, None)], None, 100);
        o.created_at = Utc.with_ymd_and_hms(2024, 3, 31, 22, 30, 0).unwrap();
        let march = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 3, 31),
        )
        .unwrap();
        let april = DateRange::new(NaiveDate::from_ymd_opt(2024, 4, 1), None).unwrap();
        let rates = VatRates::default();

        assert!(build_ledger(&[o.clone()], &FeeMap::new(), &march, &rates, 1).rows.is_empty());
        let ledger = build_ledger(&[o], &FeeMap::new(), &april, &rates, 1);
        assert_eq!(ledger.rows[0].date, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
    }

    #[test]
    fn test_overflowing_order_is_left_out_of_ledger() {
        let ok = order("ok", vec![item("Att bli till", 100, 1, None)], None, 100);
        let broken = order(
            "broken",
            vec![item("Att bli till", 10_000, 1_000_000_000_000_000, None)],
            None,
            100,
        );
        assert!(matches!(
            reconcile_order(&broken, &FeeMap::new(), &VatRates::default(), 1),
            Err(CoreError::InvalidCartState { .. })
        ));

        let ledger = build_ledger(&[broken, ok], &FeeMap::new(), &DateRange::all(), &VatRates::default(), 1);
        assert_eq!(ledger.rows.len(), 1);
        assert_eq!(ledger.rows[0].order_id, "ok");
        assert_eq!(ledger.totals.amount_inc_tax.ore(), 100);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    fn arb_line() -> impl Strategy<Value = LineItem> {
        (
            0i64..50_000,
            1i64..10,
            prop_oneof![
                Just(None),
                Just(Some(TaxCategory::Book)),
                Just(Some(TaxCategory::Merchandise))
            ],
        )
            .prop_map(|(ex, qty, category)| LineItem {
                product_id: format!("p{}", ex),
                title: "x".to_string(),
                unit_price_ex_tax: Money::from_ore(ex),
                quantity: qty,
                tax_category: category,
            })
    }

    proptest! {
        /// Re-pricing from the stored gross lines reproduces checkout's buckets.
        #[test]
        fn prop_reconciling_stored_order_matches_checkout_pricing(
            lines in prop::collection::vec(arb_line(), 1..6),
            region in prop_oneof![
                Just(ShippingRegion::Domestic),
                Just(ShippingRegion::Eu),
                Just(ShippingRegion::NonEu)
            ],
            ship in 0i64..300,
            pct in prop_oneof![Just(0u8), 1u8..=100],
            unit in prop_oneof![Just(1i64), Just(100)],
        ) {
            let config = PricingConfig {
                rates: VatRates::default(),
                rounding: RoundingPolicy { unit, cash_unit: unit },
            };
            let selection = ShippingSelection {
                option_id: "x".to_string(),
                name: "Frakt".to_string(),
                region,
                price: Money::from_ore(ship * unit),
            };
            let pricing = price_cart(&lines, &selection, pct, &config).unwrap();
            let new_order = build_pending_order(&lines, &selection, &pricing, &CheckoutRequest::default(), &config);

            let mut o = order("prop", new_order.items, new_order.shipping, 0);
            o.total_amount = new_order.total_amount;
            o.discount_amount = new_order.discount_amount;
            o.pricing = new_order.pricing;

            let row = reconcile_order(&o, &FeeMap::new(), &config.rates, unit).unwrap();

            prop_assert_eq!(row.total_tax, pricing.total.tax);
            prop_assert_eq!(row.amount_ex_tax, pricing.total.ex_tax);
            prop_assert_eq!(row.reduced_tax + row.standard_tax, row.total_tax);
            if pct == 0 {
                let reduced = pricing.rate_bucket(config.rates.reduced).unwrap().tax();
                let ship_reduced = if pricing.shipping.rate == config.rates.reduced {
                    pricing.shipping.bucket.tax()
                } else {
                    Money::zero()
                };
                prop_assert_eq!(row.reduced_tax, reduced + ship_reduced);
            }
        }
    }
}
