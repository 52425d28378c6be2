//! # VAT Rates and Rounding Policy
//!
//! The one place where a tax category becomes a rate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TaxCategory ──► VatRates::rate_for() ──► TaxRate                       │
//! │                                                                         │
//! │  Some(Book)        → reduced   (6 %)                                    │
//! │  Some(Merchandise) → standard  (25 %)                                   │
//! │  None (legacy)     → reduced                                            │
//! │                                                                         │
//! │  Used by: price_cart, shipping_rate, reconcile_order, render_csv        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::ORE_PER_KRONA;
use crate::types::{LineItem, ShippingRegion, TaxCategory, TaxRate};

// =============================================================================
// VAT Rates
// =============================================================================

/// The two Swedish VAT rates the shop deals in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatRates {
    /// Rate for books (and legacy items without a category).
    pub reduced: TaxRate,
    /// Rate for everything else.
    pub standard: TaxRate,
}

impl Default for VatRates {
    fn default() -> Self {
        VatRates {
            reduced: TaxRate::from_percent(6),
            standard: TaxRate::from_percent(25),
        }
    }
}

impl VatRates {
    /// Maps a tax category to its rate.
    ///
    /// An absent category is the one silent default in the pricing code:
    /// such rows predate categories and were all books.
    #[inline]
    pub fn rate_for(&self, category: Option<TaxCategory>) -> TaxRate {
        match category {
            Some(TaxCategory::Merchandise) => self.standard,
            Some(TaxCategory::Book) | None => self.reduced,
        }
    }

    /// Both configured rates, reduced first.
    pub fn all(&self) -> [TaxRate; 2] {
        [self.reduced, self.standard]
    }
}

// =============================================================================
// Rounding Policy
// =============================================================================

/// Granularity of the rounding steps, in öre.
///
/// ## Two Units
/// ```text
/// unit       per-line gross prices, VAT back-outs, discount amounts
/// cash_unit  the final payable total (öresavrundning)
/// ```
/// The shop runs with both at 100 (whole kronor). Setting `unit` to 1 keeps
/// öre precision per line while still charging whole kronor, in which case
/// the difference shows up as `rounding_adjustment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoundingPolicy {
    #[serde(default = "default_unit")]
    pub unit: i64,
    #[serde(default = "default_unit")]
    pub cash_unit: i64,
}

fn default_unit() -> i64 {
    ORE_PER_KRONA
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        RoundingPolicy {
            unit: ORE_PER_KRONA,
            cash_unit: ORE_PER_KRONA,
        }
    }
}

impl RoundingPolicy {
    /// Rounds everything to the öre.
    pub const fn ore() -> Self {
        RoundingPolicy {
            unit: 1,
            cash_unit: 1,
        }
    }

    /// Both units must be positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("rounding.unit", self.unit), ("rounding.cash_unit", self.cash_unit)] {
            if value <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Pricing Config
// =============================================================================

/// Everything the pricing and reconciliation code needs besides the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingConfig {
    #[serde(default)]
    pub rates: VatRates,
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

// =============================================================================
// Shipping Rate
// =============================================================================

/// Derives the VAT rate that applies to shipping from the cart composition.
///
/// ## Rules
/// ```text
/// region = non-eu              → 0 (export)
/// only books                   → reduced
/// only merchandise             → standard
/// mixed, more merchandise qty  → standard
/// mixed, otherwise (incl. tie) → reduced
/// ```
/// Items without a category count as books. An empty cart has no
/// merchandise and therefore gets the reduced rate.
pub fn shipping_rate(items: &[LineItem], region: ShippingRegion, rates: &VatRates) -> TaxRate {
    if region == ShippingRegion::NonEu {
        return TaxRate::zero();
    }

    let (books, merchandise) = items.iter().fold((0i64, 0i64), |(b, m), item| {
        match item.tax_category {
            Some(TaxCategory::Merchandise) => (b, m + item.quantity),
            Some(TaxCategory::Book) | None => (b + item.quantity, m),
        }
    });

    if merchandise > books {
        rates.standard
    } else {
        rates.reduced
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
