//! # Receipt Calculation
//!
//! Turns line items, a payment method and a tax rate set into the totals
//! printed on the coupon.
//!
//! ## Flow
//! ```text
//! ┌──────────────┐    ┌─────────────────┐    ┌────────────────────┐
//! │ LineItem[]   │───►│ per-line total  │───►│ subtotal (Σ lines) │
//! │ + method     │    │ rounded to 0,01 │    └─────────┬──────────┘
//! └──────────────┘    └─────────────────┘              │
//!                                                      ▼
//!                          ┌─────────────────┐   ┌─────────────┐
//!                          │ TaxRateSet copy │──►│ TaxBreakdown│
//!                          └─────────────────┘   └─────────────┘
//! ```
//! Taxes are informational: they are included in the price, never added on
//! top. The amount paid is the subtotal.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::money::{Money, Quantity};
use crate::tax::{TaxBreakdown, TaxRateSet};
use crate::types::{LineItem, PaymentMethod};

/// One computed line of the coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTotal {
    pub code: String,
    pub description: String,
    pub quantity: Quantity,
    pub unit_price: Money,
    pub total: Money,
}

/// Everything the coupon prints below the item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReceiptCalculation {
    pub payment_method: PaymentMethod,
    pub lines: Vec<LineTotal>,
    pub subtotal: Money,
    /// Rates in force when the coupon was calculated.
    pub rates: TaxRateSet,
    pub taxes: TaxBreakdown,
}

impl ReceiptCalculation {
    /// Amount the customer pays.
    #[inline]
    pub fn amount_due(&self) -> Money {
        self.subtotal
    }

    /// Total dispensed volume across all lines.
    pub fn total_quantity(&self) -> Quantity {
        Quantity::from_thousandths(self.lines.iter().map(|line| line.quantity.thousandths()).sum())
    }

    /// "Tributos aprox." line: `R$ 80,51 (Federal R$ 33,63 Estadual R$ 45,00 Municipal R$ 1,88)`.
    pub fn tax_notice(&self) -> String {
        format!(
            "{} (Federal {} Estadual {} Municipal {})",
            self.taxes.total(),
            self.taxes.federal,
            self.taxes.state,
            self.taxes.municipal
        )
    }
}

/// Calculates the coupon totals.
///
/// Each line is rounded to the centavo before summing, the way each line is
/// printed; taxes are applied once to the subtotal.
///
/// ## Example
/// ```rust
/// use nfce_core::money::Quantity;
/// use nfce_core::receipt::calculate_receipt;
/// use nfce_core::tax::TaxRateSet;
/// use nfce_core::types::{FuelPrice, LineItem, PaymentMethod};
///
/// let items = vec![LineItem {
///     code: "1".to_string(),
///     description: "GASOLINA COMUM".to_string(),
///     quantity: Quantity::parse_locale("40"),
///     price: FuelPrice::parse_locale("6,15", "6,25"),
/// }];
/// let rates = TaxRateSet::parse("13,45", "18", "0,75");
///
/// let receipt = calculate_receipt(&items, PaymentMethod::Pix, &rates);
/// assert_eq!(receipt.subtotal.cents(), 25000);
/// assert_eq!(receipt.taxes.total().cents(), 8051);
/// ```
pub fn calculate_receipt(
    items: &[LineItem],
    method: PaymentMethod,
    rates: &TaxRateSet,
) -> ReceiptCalculation {
    let lines: Vec<LineTotal> = items
        .iter()
        .map(|item| LineTotal {
            code: item.code.clone(),
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price(method),
            total: item.total(method),
        })
        .collect();

    let subtotal: Money = lines.iter().map(|line| line.total).sum();
    let taxes = rates.apply(subtotal);

    debug!(
        lines = lines.len(),
        %method,
        %subtotal,
        taxes = %taxes.total(),
        "receipt calculated"
    );

    ReceiptCalculation {
        payment_method: method,
        lines,
        subtotal,
        rates: *rates,
        taxes,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
