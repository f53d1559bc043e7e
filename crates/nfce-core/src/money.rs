//! # Money Module
//!
//! Provides the `Money` (centavos) and `Quantity` (milliliters) types.
//!
//! ## Why Integer Minor Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In f64:                                                                │
//! │    40.123 L × R$ 5,89 = 236.32447000000002  ❌                          │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    40123 mL × 589 centavos = 23632447 / 1000 → 23632 centavos           │
//! │    Rounded once, half away from zero, at a known point                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use nfce_core::money::{Money, Quantity};
//!
//! let price = Money::parse_locale("5,89");
//! let liters = Quantity::parse_locale("40,123");
//!
//! let total = price.times_quantity(liters);
//! assert_eq!(total.cents(), 23632);
//! assert_eq!(total.to_string(), "R$ 236,32");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::locale::{
    format_minor_units, parse_locale_decimal, CURRENCY_FRACTION_DIGITS, QUANTITY_FRACTION_DIGITS,
};

/// Divides rounding half away from zero.
fn div_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

/// Converts a decimal to integer minor units at `scale` fraction digits.
fn decimal_to_minor_units(value: Decimal, scale: u32) -> i64 {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    // Beyond i64 minor units is far outside any fuel receipt
    rounded.mantissa().to_i64().unwrap_or_default()
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in centavos (the smallest BRL unit).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  FuelPrice.cash / .card ──► LineItem total ──► ReceiptCalculation       │
/// │                                                     │                   │
/// │                              TaxBreakdown ◄─────────┤                   │
/// │                                                     │                   │
/// │                              Pix payload tag 54 ◄───┘  "236.32"         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use nfce_core::money::Money;
    ///
    /// let price = Money::from_cents(589); // R$ 5,89
    /// assert_eq!(price.cents(), 589);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from an exact decimal, rounding half away from
    /// zero to the centavo.
    ///
    /// ## Example
    /// ```rust
    /// use nfce_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(Money::from_decimal(Decimal::new(10925, 3)).cents(), 1093);
    /// ```
    pub fn from_decimal(value: Decimal) -> Self {
        Money(decimal_to_minor_units(value, CURRENCY_FRACTION_DIGITS))
    }

    /// Parses a pt-BR display string ("1.234,56"), zero when malformed.
    ///
    /// See [`crate::locale::parse_locale_decimal`] for the leniency rules.
    pub fn parse_locale(text: &str) -> Self {
        Money::from_decimal(parse_locale_decimal(text))
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole reais portion.
    #[inline]
    pub const fn reais(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavos portion (always 0-99).
    #[inline]
    pub const fn centavos_part(&self) -> i64 {
        (self.0 % 100).abs()
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

    /// Returns the exact decimal value (scale 2).
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, CURRENCY_FRACTION_DIGITS)
    }

    /// Multiplies a unit price by a volume, rounding once to the centavo.
    ///
    /// ## User Workflow
    /// ```text
    /// Pump: GASOLINA COMUM  R$ 5,89/L
    /// Dispensed: 40,123 L
    ///      │
    ///      ▼
    /// times_quantity(40,123) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: R$ 236,32
    /// ```
    pub fn times_quantity(&self, quantity: Quantity) -> Money {
        let scaled = self.0 as i128 * quantity.thousandths() as i128;
        Money(div_round_half_away(scaled, 1000) as i64)
    }

    /// pt-BR string without the currency symbol: `1.234,56`.
    pub fn to_locale_string(&self) -> String {
        format_minor_units(self.0, CURRENCY_FRACTION_DIGITS)
    }

    /// Fixed two-decimal string with a dot and no grouping: `1234.56`.
    ///
    /// This is the form the BR Code amount field (tag 54) requires.
    pub fn to_payload_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.reais().abs(), self.centavos_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the receipt form: `R$ 1.234,56`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-R$ {}", Money(-self.0).to_locale_string())
        } else {
            write!(f, "R$ {}", self.to_locale_string())
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

/// Multiplication by a whole count (e.g. units of a convenience item).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Quantity Type
// =============================================================================

/// A volumetric quantity in thousandths (liters to 3 fraction digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths (`40123` = 40,123 L).
    #[inline]
    pub const fn from_thousandths(thousandths: i64) -> Self {
        Quantity(thousandths)
    }

    /// Creates a quantity from whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    /// Creates a quantity from an exact decimal, rounding half away from zero.
    pub fn from_decimal(value: Decimal) -> Self {
        Quantity(decimal_to_minor_units(value, QUANTITY_FRACTION_DIGITS))
    }

    /// Parses a pt-BR display string ("40,123"), zero when malformed.
    pub fn parse_locale(text: &str) -> Self {
        Quantity::from_decimal(parse_locale_decimal(text))
    }

    #[inline]
    pub const fn thousandths(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, QUANTITY_FRACTION_DIGITS)
    }

    /// pt-BR string with three fraction digits: `40,123`.
    pub fn to_locale_string(&self) -> String {
        format_minor_units(self.0, QUANTITY_FRACTION_DIGITS)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_locale_string())
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
