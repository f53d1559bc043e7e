//! # Validation Module
//!
//! Strict checks for Brazilian tax identifiers.
//!
//! ## Where This Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Host form                                                              │
//! │  ├── Field presence, digit masks                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  THIS MODULE (opt-in)                                                   │
//! │  ├── Length after stripping punctuation                                │
//! │  └── Mod-11 verification digits                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Access key generation                                                  │
//! │  └── Lenient: a short CNPJ is zero-padded, never rejected              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Key generation itself does not call these checks; a host that wants to
//! reject malformed identifiers calls them first.
//!
//! ## Usage
//! ```rust
//! use nfce_core::validation::{validate_cnpj, validate_cpf};
//!
//! assert!(validate_cnpj("11.222.333/0001-81").is_ok());
//! assert!(validate_cpf("529.982.247-25").is_ok());
//! assert!(validate_cpf("529.982.247-26").is_err());
//! ```

use crate::access_key::weighted_mod11;
use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const CNPJ_LENGTH: usize = 14;
const CPF_LENGTH: usize = 11;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a CNPJ (company tax id), punctuation allowed.
///
/// ## Rules
/// - Must not be empty
/// - Exactly 14 digits after stripping `.`, `/`, `-` and spaces
/// - Not a single repeated digit (`00000000000000` passes mod-11 but is void)
/// - Both verification digits match (weights 2..=9 from the right)
///
/// Returns the bare 14-digit form.
pub fn validate_cnpj(cnpj: &str) -> ValidationResult<String> {
    let digits = identifier_digits("cnpj", cnpj, CNPJ_LENGTH)?;
    verify_digits("cnpj", &digits, 9)?;
    Ok(digits)
}

/// Validates a CPF (individual tax id), punctuation allowed.
///
/// ## Rules
/// - Exactly 11 digits after stripping `.`, `-` and spaces
/// - Not a single repeated digit
/// - Both verification digits match (weights 2..=11 from the right)
///
/// Returns the bare 11-digit form.
pub fn validate_cpf(cpf: &str) -> ValidationResult<String> {
    let digits = identifier_digits("cpf", cpf, CPF_LENGTH)?;
    verify_digits("cpf", &digits, 11)?;
    Ok(digits)
}

// =============================================================================
// Helpers
// =============================================================================

fn identifier_digits(field: &str, text: &str, expected: usize) -> ValidationResult<String> {
    let text = text.trim();

    if text.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if let Some(bad) = text
        .chars()
        .find(|c| !c.is_ascii_digit() && !matches!(c, '.' | '/' | '-' | ' '))
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("unexpected character '{}'", bad),
        });
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != expected {
        return Err(ValidationError::InvalidLength {
            field: field.to_string(),
            expected,
            actual: digits.len(),
        });
    }

    if digits.bytes().all(|b| b == digits.as_bytes()[0]) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "all digits are equal".to_string(),
        });
    }

    Ok(digits)
}

/// Checks the two trailing verification digits of an all-digit identifier.
fn verify_digits(field: &str, digits: &str, max_weight: u32) -> ValidationResult<()> {
    let base = &digits[..digits.len() - 2];
    let first = weighted_mod11(base, max_weight);
    let second = weighted_mod11(&format!("{}{}", base, first), max_weight);

    let expected = format!("{}{}", first, second);
    let actual = &digits[digits.len() - 2..];
    if expected != actual {
        return Err(ValidationError::CheckDigitMismatch {
            field: field.to_string(),
            expected,
            actual: actual.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
