//! # Locale Module
//!
//! pt-BR number text ⇄ exact decimal values.
//!
//! ## The Two Input Styles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. DISPLAY STRINGS                                                     │
//! │     "1.234,56"  ── parse_locale_decimal ──►  1234.56                    │
//! │     '.' groups thousands, ',' is the decimal point                      │
//! │                                                                         │
//! │  2. DIGIT STREAMS (masked "right-to-left" inputs)                      │
//! │     keystrokes: 1 → 12 → 123 → 1234                                    │
//! │     display:  0,01 → 0,12 → 1,23 → 12,34   (fraction_width = 2)       │
//! │                                                                         │
//! │  Both paths go through integer minor units, never through f64.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Leniency
//! [`parse_locale_decimal`] returns zero on malformed text instead of an
//! error. Forms call it on every keystroke, and half-typed values must keep
//! the receipt preview alive. Malformed input never reaches a finalized
//! document because the host stores the parsed value, not the text. Each
//! fallback is logged at `debug`. Use [`try_parse_locale_decimal`] when the
//! caller wants to reject instead.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Fraction digits of a currency amount (centavos).
pub const CURRENCY_FRACTION_DIGITS: u32 = 2;

/// Fraction digits of a volumetric quantity (liters to the milliliter).
pub const QUANTITY_FRACTION_DIGITS: u32 = 3;

/// Significant digits a masked input keeps; later keystrokes are ignored.
pub const MAX_MASK_DIGITS: usize = 15;

const THOUSANDS_SEPARATOR: char = '.';
const DECIMAL_SEPARATOR: char = ',';

// =============================================================================
// Parsing
// =============================================================================

/// Parses a pt-BR display string, returning zero when it is malformed.
///
/// ## Example
/// ```rust
/// use nfce_core::locale::parse_locale_decimal;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_locale_decimal("1.234,56"), Decimal::new(123456, 2));
/// assert_eq!(parse_locale_decimal("R$ 5,9"), Decimal::new(59, 1));
/// assert_eq!(parse_locale_decimal("12,3a"), Decimal::ZERO);
/// ```
pub fn parse_locale_decimal(text: &str) -> Decimal {
    match try_parse_locale_decimal(text) {
        Ok(value) => value,
        Err(err) => {
            debug!(input = text, %err, "locale decimal fell back to zero");
            Decimal::ZERO
        }
    }
}

/// Strict counterpart of [`parse_locale_decimal`].
///
/// ## Rules
/// - Surrounding whitespace and a leading `R$` are ignored
/// - Every `.` is a thousands separator and is dropped
/// - The first `,` is the decimal point; a second one is an error
/// - Anything else that is not an ASCII digit is an error (signs included)
pub fn try_parse_locale_decimal(text: &str) -> CoreResult<Decimal> {
    let invalid = || CoreError::InvalidDecimal {
        input: text.to_string(),
    };

    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("R$")
        .map(str::trim_start)
        .unwrap_or(trimmed);

    let mut canonical = String::with_capacity(trimmed.len() + 1);
    let mut seen_decimal_point = false;
    for c in trimmed.chars() {
        match c {
            THOUSANDS_SEPARATOR => {}
            DECIMAL_SEPARATOR if !seen_decimal_point => {
                seen_decimal_point = true;
                canonical.push('.');
            }
            '0'..='9' => canonical.push(c),
            _ => return Err(invalid()),
        }
    }

    if !canonical.bytes().any(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if canonical.starts_with('.') {
        canonical.insert(0, '0');
    }
    if canonical.ends_with('.') {
        canonical.pop();
    }

    // Fails on more digits than a Decimal can hold
    Decimal::from_str(&canonical).map_err(|_| invalid())
}

// =============================================================================
// Formatting
// =============================================================================

/// Formats a value as a grouped pt-BR string with exactly `fraction_width`
/// fraction digits, rounding half away from zero first.
///
/// ## Example
/// ```rust
/// use nfce_core::locale::format_locale;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_locale(Decimal::new(123456, 2), 2), "1.234,56");
/// assert_eq!(format_locale(Decimal::new(40, 0), 3), "40,000");
/// ```
pub fn format_locale(value: Decimal, fraction_width: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(fraction_width, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(fraction_width);

    let minor_units = rounded.mantissa();
    let digits = minor_units.unsigned_abs().to_string();
    let body = render_minor_units(&digits, fraction_width as usize);

    if minor_units < 0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Formats an integer count of minor units (centavos, milliliters).
pub(crate) fn format_minor_units(minor_units: i64, fraction_width: u32) -> String {
    let body = render_minor_units(&minor_units.unsigned_abs().to_string(), fraction_width as usize);
    if minor_units < 0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Lays out an unsigned digit string as `int,frac` with `.` grouping.
///
/// `digits` holds only ASCII digits and may be empty.
fn render_minor_units(digits: &str, fraction_width: usize) -> String {
    let significant = digits.trim_start_matches('0');
    let padded = format!("{:0>width$}", significant, width = fraction_width + 1);
    let (integer_part, fraction_part) = padded.split_at(padded.len() - fraction_width);

    let mut grouped = String::with_capacity(integer_part.len() + integer_part.len() / 3);
    for (i, c) in integer_part.chars().enumerate() {
        if i > 0 && (integer_part.len() - i) % 3 == 0 {
            grouped.push(THOUSANDS_SEPARATOR);
        }
        grouped.push(c);
    }

    if fraction_width == 0 {
        grouped
    } else {
        format!("{}{}{}", grouped, DECIMAL_SEPARATOR, fraction_part)
    }
}

// =============================================================================
// Masked Input
// =============================================================================

/// Renders a keystroke digit stream as a masked pt-BR value.
///
/// The stream is read as an integer number of minor units with
/// `fraction_width` implied fraction digits. Non-digit characters are
/// skipped, and only the first [`MAX_MASK_DIGITS`] significant digits count.
///
/// ## User Workflow
/// ```text
/// Pump screen: "Valor (R$)"
///
/// typed   │ raw_digits │ display
/// ────────┼────────────┼──────────
///  (none) │ ""         │ 0,00
///  5      │ "5"        │ 0,05
///  0      │ "50"       │ 0,50
///  0      │ "500"      │ 5,00
///  0      │ "5000"     │ 50,00
/// ```
///
/// ## Example
/// ```rust
/// use nfce_core::locale::mask_from_digit_stream;
///
/// assert_eq!(mask_from_digit_stream("", 2), "0,00");
/// assert_eq!(mask_from_digit_stream("123456", 2), "1.234,56");
/// assert_eq!(mask_from_digit_stream("40000", 3), "40,000");
/// ```
pub fn mask_from_digit_stream(raw_digits: &str, fraction_width: u32) -> String {
    let significant: String = raw_digits
        .chars()
        .filter(char::is_ascii_digit)
        .skip_while(|&c| c == '0')
        .take(MAX_MASK_DIGITS)
        .collect();

    render_minor_units(&significant, fraction_width as usize)
}

// =============================================================================
// Rounding
// =============================================================================

/// Rounds to 2 decimal places, half away from zero (never banker's rounding).
///
/// Applied before every currency display and before a payload amount is
/// encoded, so the printed total and the Pix amount always agree.
///
/// ## Example
/// ```rust
/// use nfce_core::locale::round_half_up_2dp;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_half_up_2dp(Decimal::new(10925, 3)), Decimal::new(1093, 2));
/// assert_eq!(round_half_up_2dp(Decimal::new(10935, 3)), Decimal::new(1094, 2));
/// ```
pub fn round_half_up_2dp(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Unit Tests
// =============================================================================
