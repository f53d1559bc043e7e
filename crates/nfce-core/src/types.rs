//! # Domain Types
//!
//! Pricing and payment types shared by the receipt calculation and the host.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │   FuelPrice     │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code           │──►│  cash (Money)   │◄──│  Cash    → cash │       │
//! │  │  description    │   │  card (Money)   │   │  Debit   → card │       │
//! │  │  quantity (L)   │   └─────────────────┘   │  Credit  → card │       │
//! │  │  price          │                         │  Pix     → card │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Two Prices?
//! Fuel stations post a lower price for cash at the pump. Every other payment
//! method pays the posted card price, Pix included.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Quantity};

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Debit,
    Credit,
    /// Instant transfer; the receipt carries a BR Code.
    Pix,
}

impl PaymentMethod {
    /// Which posted price this method pays.
    pub const fn price_tier(&self) -> PriceTier {
        match self {
            PaymentMethod::Cash => PriceTier::Cash,
            PaymentMethod::Debit | PaymentMethod::Credit | PaymentMethod::Pix => PriceTier::Card,
        }
    }

    /// True when the receipt must carry a Pix payload.
    pub const fn is_instant_transfer(&self) -> bool {
        matches!(self, PaymentMethod::Pix)
    }

    /// Payment means code (`tPag`) of the NFC-e layout.
    pub const fn fiscal_code(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "01",
            PaymentMethod::Credit => "03",
            PaymentMethod::Debit => "04",
            PaymentMethod::Pix => "17",
        }
    }

    /// Label printed on the coupon.
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Dinheiro",
            PaymentMethod::Debit => "Cartão de Débito",
            PaymentMethod::Credit => "Cartão de Crédito",
            PaymentMethod::Pix => "PIX",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Debit => write!(f, "debit"),
            PaymentMethod::Credit => write!(f, "credit"),
            PaymentMethod::Pix => write!(f, "pix"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "dinheiro" => Ok(PaymentMethod::Cash),
            "debit" | "debito" | "débito" => Ok(PaymentMethod::Debit),
            "credit" | "credito" | "crédito" => Ok(PaymentMethod::Credit),
            "pix" => Ok(PaymentMethod::Pix),
            other => Err(ValidationError::InvalidFormat {
                field: "payment method".to_string(),
                reason: format!(
                    "unknown '{}'. Valid options: cash, debit, credit, pix",
                    other
                ),
            }),
        }
    }
}

/// Which of the two posted prices applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Cash,
    Card,
}

// =============================================================================
// Pricing
// =============================================================================

/// Posted unit prices of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FuelPrice {
    pub cash: Money,
    pub card: Money,
}

impl FuelPrice {
    /// Parses both prices from pt-BR display strings (zero when malformed).
    pub fn parse_locale(cash: &str, card: &str) -> Self {
        FuelPrice {
            cash: Money::parse_locale(cash),
            card: Money::parse_locale(card),
        }
    }

    /// Unit price for a payment method.
    #[inline]
    pub const fn for_method(&self, method: PaymentMethod) -> Money {
        match method.price_tier() {
            PriceTier::Cash => self.cash,
            PriceTier::Card => self.card,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A product dispensed or sold on this coupon.
///
/// Carries a copy of the posted prices, so a later price change never
/// alters a coupon in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Product code printed in the item column.
    pub code: String,
    pub description: String,
    pub quantity: Quantity,
    pub price: FuelPrice,
}

impl LineItem {
    /// Unit price that applies under `method`.
    #[inline]
    pub const fn unit_price(&self, method: PaymentMethod) -> Money {
        self.price.for_method(method)
    }

    /// `quantity × unit price`, rounded to the centavo.
    pub fn total(&self, method: PaymentMethod) -> Money {
        self.unit_price(method).times_quantity(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
