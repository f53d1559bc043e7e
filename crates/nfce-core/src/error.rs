//! # Error Types
//!
//! Domain-specific error types for nfce-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  nfce-core errors (this file)                                          │
//! │  ├── CoreError        - Precondition violations, strict parse failures │
//! │  └── ValidationError  - Strict identifier checks (CNPJ, CPF, key)      │
//! │                                                                         │
//! │  demo app errors (separate crate)                                      │
//! │  └── AppError         - Config loading, CLI input                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → AppError → stderr                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error Here
//! Tolerated malformed input (an unparseable amount while the user is still
//! typing, an empty Pix key) resolves to zero or an empty payload through the
//! lenient entry points. Only the strict entry points and logical
//! preconditions surface a `CoreError`.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core fiscal logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Text could not be read as a pt-BR decimal.
    ///
    /// Only returned by the strict parser; the lenient parser maps the same
    /// input to zero.
    #[error("Invalid decimal: '{input}'")]
    InvalidDecimal { input: String },

    /// Reverse tax calculation was asked against a zero subtotal.
    ///
    /// ## When This Occurs
    /// ```text
    /// Subtotal: R$ 0,00
    ///      │
    ///      ▼
    /// User edits "Tributos federais" to R$ 1,50
    ///      │
    ///      ▼
    /// reverse(1,50, 0,00) → ZeroSubtotal
    ///      │
    ///      ▼
    /// UI keeps the previous rate and blocks the edit
    /// ```
    #[error("Cannot derive a tax rate from a zero subtotal")]
    ZeroSubtotal,

    /// A 44-digit access key failed structural checks.
    #[error("Invalid access key: {reason}")]
    InvalidAccessKey { reason: String },

    /// A BR Code payload could not be decoded.
    #[error("Invalid payment payload: {reason}")]
    InvalidPayload { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Strict input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field has the wrong number of digits.
    #[error("{field} must have {expected} digits, got {actual}")]
    InvalidLength {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Invalid format (e.g., letters in a numeric identifier).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Verification digits do not match the body.
    #[error("{field} check digit mismatch: expected {expected}, got {actual}")]
    CheckDigitMismatch {
        field: String,
        expected: String,
        actual: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
