//! # Money Module
//!
//! Provides the `Money` type and the rounding primitives every price in the
//! shop passes through.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    94 × 1.06 = 99.64000000000001                                        │
//! │                                                                         │
//! │  A VAT back-out done in floats drifts by an öre every few orders and   │
//! │  the bookkeeping export no longer matches the settled charge.           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer öre + rational rounding                          │
//! │    gross = round(net × (10000 + bps) / 10000)   (i128, exact)           │
//! │    net   = round(gross × 10000 / (10000 + bps)) (i128, exact)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Units
//! Every rounding helper takes a `unit` (in öre). With `unit = 100` results
//! are whole kronor, which is what the shop shows customers. With `unit = 1`
//! results are rounded to the öre.
//!
//! ## Usage
//! ```rust
//! use kassa_core::money::Money;
//! use kassa_core::types::TaxRate;
//!
//! let net = Money::from_kronor(94);
//! let gross = net.to_gross(TaxRate::from_bps(600), 100);
//! assert_eq!(gross, Money::from_kronor(100));
//! assert_eq!(gross.to_net(TaxRate::from_bps(600), 100), Money::from_kronor(94));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

/// Basis points in 100 %.
const BPS_SCALE: i128 = 10_000;

/// Öre per krona.
pub const ORE_PER_KRONA: i64 = 100;

// =============================================================================
// Rounding Primitive
// =============================================================================

/// Divides `numerator` by `denominator`, rounding half toward positive infinity.
///
/// This is `floor(n / d + 0.5)`, the same tie behaviour the shop front end
/// has always used (`Math.round`), so prices shown before checkout match the
/// ones computed here to the öre.
///
/// `denominator` must be positive.
///
/// ```rust
/// use kassa_core::money::round_div;
///
/// assert_eq!(round_div(5, 2), 3);   //  2.5 →  3
/// assert_eq!(round_div(-5, 2), -2); // -2.5 → -2
/// assert_eq!(round_div(7, 3), 2);   //  2.33 → 2
/// ```
#[inline]
pub fn round_div(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0, "round_div requires a positive denominator");
    (2 * numerator + denominator).div_euclid(2 * denominator)
}

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in öre (the smallest SEK unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for discounts and fee deductions
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support; serializes as a bare integer
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► LineItem.unit_price_ex_tax ──► price_cart()          │
/// │                                                     │                   │
/// │                         OrderPricingResult ◄────────┘                   │
/// │                                │                                        │
/// │           Order.total_amount ◄─┘──► Gateway line items (gross)          │
/// │                                                                         │
/// │  Order ──► reconcile_order() ──► AccountingRow ──► CSV export          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from öre.
    #[inline]
    pub const fn from_ore(ore: i64) -> Self {
        Money(ore)
    }

    /// Creates a Money value from whole kronor.
    ///
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// assert_eq!(Money::from_kronor(39).ore(), 3900);
    /// ```
    #[inline]
    pub const fn from_kronor(kronor: i64) -> Self {
        Money(kronor * ORE_PER_KRONA)
    }

    /// Returns the value in öre.
    #[inline]
    pub const fn ore(&self) -> i64 {
        self.0
    }

    /// Returns the whole-krona portion (truncated toward zero).
    #[inline]
    pub const fn kronor(&self) -> i64 {
        self.0 / ORE_PER_KRONA
    }

    /// Returns the öre portion (always 0-99).
    #[inline]
    pub const fn ore_part(&self) -> i64 {
        (self.0 % ORE_PER_KRONA).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a quantity. `None` on overflow.
    ///
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// assert_eq!(Money::from_ore(1000).checked_mul(3), Some(Money::from_ore(3000)));
    /// assert_eq!(Money::from_ore(i64::MAX).checked_mul(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(ore) => Some(Money(ore)),
            None => None,
        }
    }

    /// Adds two amounts. `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(ore) => Some(Money(ore)),
            None => None,
        }
    }

    /// Rounds to the nearest multiple of `unit` öre.
    ///
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// assert_eq!(Money::from_ore(13_950).round_to(100).ore(), 14_000);
    /// assert_eq!(Money::from_ore(13_949).round_to(100).ore(), 13_900);
    /// ```
    pub fn round_to(&self, unit: i64) -> Money {
        Money::from_rational(self.0 as i128, 1, unit)
    }

    /// Adds VAT to a tax-exclusive amount: `round(net × (1 + rate))`.
    ///
    /// ## User Workflow
    /// ```text
    /// Catalog price 94 kr ex. moms, book (6 %)
    ///      │
    ///      ▼
    /// to_gross(6 %, 100) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Shown in cart: 100 kr
    /// ```
    pub fn to_gross(&self, rate: TaxRate, unit: i64) -> Money {
        Money::from_rational(
            self.0 as i128 * (BPS_SCALE + rate.bps() as i128),
            BPS_SCALE,
            unit,
        )
    }

    /// Backs the VAT out of a tax-inclusive amount: `round(gross / (1 + rate))`.
    ///
    /// The tax portion is always derived as `gross - net` by the caller, so
    /// the pair reconciles exactly.
    pub fn to_net(&self, rate: TaxRate, unit: i64) -> Money {
        Money::from_rational(
            self.0 as i128 * BPS_SCALE,
            BPS_SCALE + rate.bps() as i128,
            unit,
        )
    }

    /// Returns `round(self × percent / 100)`.
    pub fn percentage(&self, percent: u8, unit: i64) -> Money {
        Money::from_rational(self.0 as i128 * percent as i128, 100, unit)
    }

    /// Returns `round(self × numerator / denominator)`, or zero when the
    /// denominator is zero.
    ///
    /// Used to carry a discount over to the tax-exclusive side in proportion.
    pub fn proportion(&self, numerator: Money, denominator: Money, unit: i64) -> Money {
        if denominator.0 == 0 {
            return Money::zero();
        }
        let (num, den) = if denominator.0 < 0 {
            (-(self.0 as i128 * numerator.0 as i128), -(denominator.0 as i128))
        } else {
            (self.0 as i128 * numerator.0 as i128, denominator.0 as i128)
        };
        Money::from_rational(num, den, unit)
    }

    /// Formats as a decimal with a comma separator and no currency suffix.
    ///
    /// This is the spreadsheet-friendly form used by the bookkeeping export.
    ///
    /// ```rust
    /// use kassa_core::money::Money;
    ///
    /// assert_eq!(Money::from_ore(123_456).to_decimal_string(), "1234,56");
    /// assert_eq!(Money::from_ore(-5).to_decimal_string(), "-0,05");
    /// ```
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{},{:02}", sign, self.kronor().abs(), self.ore_part())
    }

    fn from_rational(numerator: i128, denominator: i128, unit: i64) -> Money {
        debug_assert!(unit > 0, "rounding unit must be positive");
        let units = round_div(numerator, denominator * unit as i128);
        Money((units * unit as i128) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money the way the shop prints it: `1234,56 kr`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kr", self.to_decimal_string())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
