//! # nfce-core: Fiscal Encoding for the NFC-e Simulator
//!
//! Everything a fuel-station coupon needs that must be exactly right:
//! locale money, approximate taxes, the 44-digit access key and the Pix
//! BR Code payload. No I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        NFC-e Simulator                                  │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Host (form screens / nfce-demo)                 │   │
//! │  │   station profile ──► fuel + liters ──► payment ──► coupon      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ strings in, strings out                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ nfce-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐    │   │
//! │  │   │  locale  │ │   tax    │ │ access_key │ │     pix      │    │   │
//! │  │   │  money   │ │ receipt  │ │ validation │ │   checksum   │    │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └──────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO PRINTING • NO QR IMAGES                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        QR renderer / printer / PDF export (external)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`locale`] - pt-BR parsing, formatting, masked input, rounding
//! - [`money`] - `Money` (centavos) and `Quantity` (thousandths)
//! - [`checksum`] - CRC-16/CCITT-FALSE
//! - [`access_key`] - 44-digit access key and mod-11 check digit
//! - [`tax`] - forward/reverse approximate tax
//! - [`pix`] - BR Code payload encoder and TLV reader
//! - [`types`] - payment methods, prices, line items
//! - [`receipt`] - coupon totals
//! - [`validation`] - strict CNPJ/CPF checks
//! - [`error`] - domain error types
//!
//! ## Design Principles
//!
//! 1. **Lenient where the user types**: malformed amounts become zero, an empty
//!    Pix key becomes an empty payload. Each fallback emits a `debug` event.
//! 2. **Strict where it matters**: a reverse tax against a zero subtotal is an
//!    error, never a silent 0%.
//! 3. **Integer Money**: currency in centavos, rounded half away from zero.
//! 4. **Injected randomness**: the access-key nonce comes from a [`NonceSource`].
//!
//! ## Example Usage
//!
//! ```rust
//! use nfce_core::access_key::{build_access_key, AccessKeyRequest, FixedNonce};
//! use nfce_core::pix::{PixCharge, PixKeyType};
//! use nfce_core::Money;
//!
//! let key = build_access_key(
//!     &AccessKeyRequest {
//!         state_code: "35".to_string(),
//!         cnpj: "12345678000195".to_string(),
//!         series: "1".to_string(),
//!         number: "1231".to_string(),
//!         emission_type: "1".to_string(),
//!         emission_date: chrono::NaiveDate::from_ymd_opt(2024, 10, 1),
//!     },
//!     &mut FixedNonce(12345678),
//! );
//! assert_eq!(key.as_str().len(), 44);
//!
//! let payload = PixCharge {
//!     key: "123.456.789-01".to_string(),
//!     key_type: PixKeyType::Cpf,
//!     merchant_name: "Loja Teste".to_string(),
//!     city: "São Paulo".to_string(),
//!     amount: Some(Money::from_cents(1000)),
//!     txid: None,
//! }
//! .payload();
//! assert!(payload.ends_with("63044D45"));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access_key;
pub mod checksum;
pub mod error;
pub mod locale;
pub mod money;
pub mod pix;
pub mod receipt;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access_key::{build_access_key, AccessKey, AccessKeyRequest, FixedNonce, NonceSource};
pub use checksum::crc16;
pub use error::{CoreError, CoreResult, ValidationError};
pub use locale::{mask_from_digit_stream, parse_locale_decimal, round_half_up_2dp};
pub use money::{Money, Quantity};
pub use pix::{PixCharge, PixKeyType};
pub use receipt::{calculate_receipt, ReceiptCalculation};
pub use tax::{TaxBreakdown, TaxRate, TaxRateSet};
pub use types::*;
