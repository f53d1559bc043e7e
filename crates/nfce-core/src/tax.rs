//! # Tax Module
//!
//! Approximate tax breakdown printed on the coupon ("Lei da Transparência").
//!
//! ## Two Directions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  FORWARD  (rate → value)                                                │
//! │    subtotal R$ 250,00 × 13,45% = R$ 33,625 → R$ 33,63                   │
//! │                                                                         │
//! │  REVERSE  (value → rate)                                                │
//! │    R$ 33,63 ÷ R$ 250,00 × 100 = 13,452%                                 │
//! │    kept to 6 fraction digits: a rate is reused across many subtotals,   │
//! │    so it needs more precision than a currency value                     │
//! │                                                                         │
//! │  Which direction runs is the form's choice, not state held here.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::locale::{parse_locale_decimal, round_half_up_2dp};
use crate::money::Money;

/// Fraction digits kept on a derived (reverse) rate.
pub const RATE_FRACTION_DIGITS: u32 = 6;

// =============================================================================
// Tax Rate
// =============================================================================

/// A non-negative percentage (`13.45` = 13,45%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(#[ts(type = "string")] Decimal);

impl TaxRate {
    /// Creates a rate from a percentage, clamping negatives to zero and
    /// keeping at most 6 fraction digits.
    pub fn from_percent(percent: Decimal) -> Self {
        if percent.is_sign_negative() {
            return TaxRate::zero();
        }
        TaxRate(
            percent
                .round_dp_with_strategy(RATE_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
        )
    }

    /// Parses a stored rate string, zero when malformed.
    ///
    /// ## Rules
    /// - Text containing `,` is read as pt-BR (`"1.234,5"`)
    /// - Otherwise `.` is the decimal point (`"13.45"`)
    ///
    /// ## Example
    /// ```rust
    /// use nfce_core::tax::TaxRate;
    /// use rust_decimal::Decimal;
    ///
    /// assert_eq!(TaxRate::parse("13,45").percent(), Decimal::new(1345, 2));
    /// assert_eq!(TaxRate::parse("13.45").percent(), Decimal::new(1345, 2));
    /// assert!(TaxRate::parse("n/a").is_zero());
    /// ```
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim().trim_end_matches('%').trim_end();
        let percent = if trimmed.contains(',') {
            parse_locale_decimal(trimmed)
        } else {
            match Decimal::from_str(trimmed) {
                Ok(value) => value,
                Err(err) => {
                    debug!(input = text, %err, "tax rate fell back to zero");
                    Decimal::ZERO
                }
            }
        };
        TaxRate::from_percent(percent)
    }

    #[inline]
    pub fn percent(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// pt-BR form with trailing zeros trimmed: `13,452`, `18`, `0,000001`.
    pub fn to_display_string(&self) -> String {
        self.0.normalize().to_string().replace('.', ",")
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.to_display_string())
    }
}

// =============================================================================
// Forward / Reverse
// =============================================================================

/// Tax value of `subtotal` at `rate`, rounded half away from zero.
///
/// ## Example
/// ```rust
/// use nfce_core::money::Money;
/// use nfce_core::tax::{forward, TaxRate};
///
/// let tax = forward(TaxRate::parse("13,45"), Money::from_cents(25000));
/// assert_eq!(tax.cents(), 3363); // 33,625 → 33,63
/// ```
pub fn forward(rate: TaxRate, subtotal: Money) -> Money {
    let exact = subtotal
        .to_decimal()
        .checked_mul(rate.percent())
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED));

    match exact {
        Some(value) => Money::from_decimal(round_half_up_2dp(value)),
        None => {
            debug!(%rate, %subtotal, "tax value overflowed, using zero");
            Money::zero()
        }
    }
}

/// Rate that yields `target` on `subtotal`, kept to 6 fraction digits.
///
/// ## Errors
/// [`CoreError::ZeroSubtotal`] when `subtotal` is zero. A zero rate would be
/// indistinguishable from a real 0%, so the caller must keep the old rate.
///
/// ## Example
/// ```rust
/// use nfce_core::money::Money;
/// use nfce_core::tax::reverse;
///
/// let rate = reverse(Money::from_cents(3363), Money::from_cents(25000)).unwrap();
/// assert_eq!(rate.to_display_string(), "13,452");
/// assert!(reverse(Money::from_cents(100), Money::zero()).is_err());
/// ```
pub fn reverse(target: Money, subtotal: Money) -> CoreResult<TaxRate> {
    if subtotal.is_zero() {
        return Err(CoreError::ZeroSubtotal);
    }

    let ratio = target
        .to_decimal()
        .checked_div(subtotal.to_decimal())
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or_default();

    Ok(TaxRate::from_percent(ratio))
}

// =============================================================================
// Rate Set & Breakdown
// =============================================================================

/// The three rates of the approximate tax notice.
///
/// A receipt copies the set it was calculated with, so a later catalog edit
/// never changes an emitted coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRateSet {
    pub federal: TaxRate,
    pub state: TaxRate,
    pub municipal: TaxRate,
}

impl TaxRateSet {
    /// Builds a set from stored rate strings (see [`TaxRate::parse`]).
    pub fn parse(federal: &str, state: &str, municipal: &str) -> Self {
        TaxRateSet {
            federal: TaxRate::parse(federal),
            state: TaxRate::parse(state),
            municipal: TaxRate::parse(municipal),
        }
    }

    /// Applies every rate to the same subtotal.
    pub fn apply(&self, subtotal: Money) -> TaxBreakdown {
        TaxBreakdown {
            federal: forward(self.federal, subtotal),
            state: forward(self.state, subtotal),
            municipal: forward(self.municipal, subtotal),
        }
    }
}

/// Currency values of each tax sphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub federal: Money,
    pub state: Money,
    pub municipal: Money,
}

impl TaxBreakdown {
    /// Sum of the three spheres (each already rounded).
    pub fn total(&self) -> Money {
        self.federal + self.state + self.municipal
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rate_parse() {
        assert_eq!(TaxRate::parse("18").percent(), Decimal::new(18, 0));
        assert_eq!(TaxRate::parse("0,75").percent(), Decimal::new(75, 2));
        assert_eq!(TaxRate::parse(" 13.4500 % ").percent(), Decimal::new(1345, 2));
        assert!(TaxRate::parse("").is_zero());
        assert!(TaxRate::parse("-5").is_zero());
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(TaxRate::parse("13.4500").to_display_string(), "13,45");
        assert_eq!(TaxRate::parse("18").to_string(), "18%");
        assert_eq!(TaxRate::zero().to_display_string(), "0");
    }

    #[test]
    fn test_forward_rounds_half_away() {
        let subtotal = Money::from_cents(25000);
        assert_eq!(forward(TaxRate::parse("13.45"), subtotal).cents(), 3363);
        assert_eq!(forward(TaxRate::parse("0.75"), subtotal).cents(), 188);
        assert_eq!(forward(TaxRate::parse("18"), subtotal).cents(), 4500);
        assert_eq!(forward(TaxRate::zero(), subtotal).cents(), 0);
    }

    #[test]
    fn test_reverse() {
        let rate = reverse(Money::from_cents(1093), Money::from_cents(8743)).unwrap();
        assert_eq!(rate.percent(), Decimal::new(1250143, 5));

        let rate = reverse(Money::from_cents(100), Money::from_cents(300)).unwrap();
        assert_eq!(rate.percent(), Decimal::new(33333333, 6));
    }

    #[test]
    fn test_reverse_zero_subtotal_is_error() {
        let err = reverse(Money::from_cents(150), Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::ZeroSubtotal));
    }

    #[test]
    fn test_reverse_zero_target_is_valid_zero() {
        let rate = reverse(Money::zero(), Money::from_cents(1000)).unwrap();
        assert!(rate.is_zero());
    }

    #[test]
    fn test_breakdown() {
        let rates = TaxRateSet::parse("13,45", "18", "0,75");
        let taxes = rates.apply(Money::from_cents(25000));
        assert_eq!(taxes.federal.cents(), 3363);
        assert_eq!(taxes.state.cents(), 4500);
        assert_eq!(taxes.municipal.cents(), 188);
        assert_eq!(taxes.total().cents(), 8051);
    }

    proptest! {
        #[test]
        fn prop_reverse_inverts_forward(
            subtotal_cents in 1i64..10_000_000,
            rate_ten_thousandths in 0i64..=1_000_000,
        ) {
            let subtotal = Money::from_cents(subtotal_cents);
            let rate = TaxRate::from_percent(Decimal::new(rate_ten_thousandths, 4));

            let recovered = reverse(forward(rate, subtotal), subtotal).unwrap();

            // half a centavo of forward rounding, seen through the subtotal,
            // plus the last kept rate digit
            let tolerance = Decimal::new(50, 0) / Decimal::from(subtotal_cents)
                + Decimal::new(1, RATE_FRACTION_DIGITS);
            prop_assert!((recovered.percent() - rate.percent()).abs() <= tolerance);
        }
    }
}
