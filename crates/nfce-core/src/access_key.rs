//! # Access Key Module
//!
//! Builds the 44-digit NFC-e access key ("chave de acesso").
//!
//! ## Layout
//! ```text
//! ┌────┬──────┬────────────────┬────┬─────┬───────────┬───┬──────────┬───┐
//! │ UF │ AAMM │      CNPJ      │ mod│ ser │   número  │ tp│  nonce   │ DV│
//! │ 2  │  4   │       14       │ 2  │  3  │     9     │ 1 │    8     │ 1 │
//! └────┴──────┴────────────────┴────┴─────┴───────────┴───┴──────────┴───┘
//!   35   2410   12345678000195   65   001   000000123   1   12345678   3
//!  └──────────────────────── 43-digit body ──────────────────────────┘
//! ```
//!
//! Every field is forced to its width (left zero-pad, or keep the rightmost
//! digits when too long), so the body is always exactly 43 digits.
//!
//! ## Check Digit (modulo 11)
//! Walk the body from the last digit to the first with weights
//! `2,3,4,5,6,7,8,9,2,3,...`, sum the products, take `r = sum % 11`.
//! The digit is `0` when `r` is 0 or 1, otherwise `11 - r`.
//!
//! ## Randomness
//! The 8-digit nonce only varies otherwise identical keys; it has no security
//! role. It comes from an injected [`NonceSource`] so tests can pin it.

use chrono::{Local, NaiveDate};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Total digits of an access key, check digit included.
pub const ACCESS_KEY_LENGTH: usize = 44;

/// Digits before the check digit.
pub const ACCESS_KEY_BODY_LENGTH: usize = 43;

/// Document model code of the consumer fiscal coupon (NFC-e).
pub const NFCE_MODEL: &str = "65";

const STATE_CODE_WIDTH: usize = 2;
const CNPJ_WIDTH: usize = 14;
const SERIES_WIDTH: usize = 3;
const NUMBER_WIDTH: usize = 9;
const EMISSION_TYPE_WIDTH: usize = 1;
const NONCE_WIDTH: usize = 8;
const NONCE_UPPER_BOUND: u32 = 100_000_000;

// =============================================================================
// Nonce Source
// =============================================================================

/// Supplies the 8-digit random token of the access key.
pub trait NonceSource {
    /// Returns a value in `0..100_000_000`.
    fn next_nonce(&mut self) -> u32;
}

impl<R: RngCore> NonceSource for R {
    fn next_nonce(&mut self) -> u32 {
        self.gen_range(0..NONCE_UPPER_BOUND)
    }
}

/// A nonce source that always yields the same token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedNonce(pub u32);

impl NonceSource for FixedNonce {
    fn next_nonce(&mut self) -> u32 {
        self.0 % NONCE_UPPER_BOUND
    }
}

// =============================================================================
// Request & Identity
// =============================================================================

/// Invoice metadata supplied by the host when emitting a coupon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccessKeyRequest {
    /// IBGE numeric state code ("35" for SP). See [`state_code_for_uf`].
    pub state_code: String,
    /// Issuer CNPJ; punctuation is ignored.
    pub cnpj: String,
    pub series: String,
    /// Sequential coupon number within the series.
    pub number: String,
    /// "1" = normal emission, "9" = offline contingency.
    pub emission_type: String,
    /// Emission date; today's local date when absent.
    #[ts(as = "Option<String>")]
    pub emission_date: Option<NaiveDate>,
}

/// Every field of the key body, already forced to its fixed width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalIdentity {
    pub state_code: String,
    pub year_month: String,
    pub cnpj: String,
    pub model: String,
    pub series: String,
    pub number: String,
    pub emission_type: String,
    pub nonce: String,
}

impl FiscalIdentity {
    /// Resolves a request into fixed-width fields, drawing one nonce.
    pub fn resolve(request: &AccessKeyRequest, nonces: &mut impl NonceSource) -> Self {
        let emission_date = request
            .emission_date
            .unwrap_or_else(|| Local::now().date_naive());

        let cnpj_digits = digits_only(&request.cnpj);
        if cnpj_digits.len() < CNPJ_WIDTH {
            debug!(
                cnpj = %request.cnpj,
                digits = cnpj_digits.len(),
                "short CNPJ zero-padded into access key"
            );
        }

        FiscalIdentity {
            state_code: fit_digits(&request.state_code, STATE_CODE_WIDTH),
            year_month: emission_date.format("%y%m").to_string(),
            cnpj: fit_digits(&cnpj_digits, CNPJ_WIDTH),
            model: NFCE_MODEL.to_string(),
            series: fit_digits(&request.series, SERIES_WIDTH),
            number: fit_digits(&request.number, NUMBER_WIDTH),
            emission_type: fit_digits(&request.emission_type, EMISSION_TYPE_WIDTH),
            nonce: format!("{:0width$}", nonces.next_nonce(), width = NONCE_WIDTH),
        }
    }

    /// Concatenates the fields in key order: always 43 digits.
    pub fn body(&self) -> String {
        [
            self.state_code.as_str(),
            self.year_month.as_str(),
            self.cnpj.as_str(),
            self.model.as_str(),
            self.series.as_str(),
            self.number.as_str(),
            self.emission_type.as_str(),
            self.nonce.as_str(),
        ]
        .concat()
    }
}

// =============================================================================
// Access Key
// =============================================================================

/// A 44-digit access key whose last digit is a valid modulo-11 check digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export)]
pub struct AccessKey(String);

impl AccessKey {
    /// Appends the check digit to an identity's body.
    pub fn from_identity(identity: &FiscalIdentity) -> Self {
        let body = identity.body();
        let check_digit = mod11_check_digit(&body);
        AccessKey(format!("{}{}", body, check_digit))
    }

    /// Parses a key typed or scanned by a user (spaces allowed) and verifies
    /// its length and check digit.
    ///
    /// ## Example
    /// ```rust
    /// use nfce_core::access_key::AccessKey;
    ///
    /// let key = AccessKey::parse("3524 1012 3456 7800 0195 6500 1000 0001 2311 2345 6783").unwrap();
    /// assert_eq!(key.check_digit(), 3);
    /// assert!(AccessKey::parse("3524101234567800019565001000000123112345679").is_err());
    /// ```
    pub fn parse(text: &str) -> CoreResult<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

        if !compact.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::InvalidAccessKey {
                reason: "must contain only digits".to_string(),
            });
        }
        if compact.len() != ACCESS_KEY_LENGTH {
            return Err(CoreError::InvalidAccessKey {
                reason: format!("expected {} digits, got {}", ACCESS_KEY_LENGTH, compact.len()),
            });
        }

        let (body, given) = compact.split_at(ACCESS_KEY_BODY_LENGTH);
        let expected = mod11_check_digit(body);
        if given != expected.to_string() {
            return Err(CoreError::InvalidAccessKey {
                reason: format!("check digit should be {}, got {}", expected, given),
            });
        }

        Ok(AccessKey(compact))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 43 digits before the check digit.
    #[inline]
    pub fn body(&self) -> &str {
        &self.0[..ACCESS_KEY_BODY_LENGTH]
    }

    /// The trailing modulo-11 digit.
    pub fn check_digit(&self) -> u8 {
        self.0.as_bytes()[ACCESS_KEY_BODY_LENGTH] - b'0'
    }

    /// Issuer CNPJ embedded in the key.
    #[inline]
    pub fn cnpj(&self) -> &str {
        &self.0[6..20]
    }

    /// Year-month token (`AAMM`).
    #[inline]
    pub fn year_month(&self) -> &str {
        &self.0[2..6]
    }

    /// Space-separated 4-digit clusters, the way DANFE layouts print the key.
    pub fn grouped(&self) -> String {
        self.0
            .as_bytes()
            .chunks(4)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccessKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds an access key from invoice metadata.
///
/// ## User Workflow
/// ```text
/// Attendant taps "Emitir NFC-e"
///      │
///      ▼
/// build_access_key(request, rng) ← THIS FUNCTION
///      │
///      ├── AAMM from emission date (or today)
///      ├── pad/trim every field to width
///      ├── draw 8-digit nonce
///      └── append modulo-11 digit
///      │
///      ▼
/// "3524 1012 3456 7800 0195 6500 1000 0001 2311 2345 6783" on the coupon
/// ```
pub fn build_access_key(request: &AccessKeyRequest, nonces: &mut impl NonceSource) -> AccessKey {
    let identity = FiscalIdentity::resolve(request, nonces);
    let key = AccessKey::from_identity(&identity);
    debug!(key = %key, "access key built");
    key
}

// =============================================================================
// Modulo 11
// =============================================================================

/// Modulo-11 check digit with weights cycling `2..=9` from the right.
///
/// Shared by access keys and CNPJ verification digits.
pub fn mod11_check_digit(digits: &str) -> u8 {
    weighted_mod11(digits, 9)
}

/// Modulo-11 check digit with weights `2..=max_weight`, wrapping back to 2.
///
/// Non-digit characters are skipped.
pub(crate) fn weighted_mod11(digits: &str, max_weight: u32) -> u8 {
    let mut weight = 2;
    let mut sum: u32 = 0;
    for byte in digits.bytes().rev().filter(u8::is_ascii_digit) {
        sum += (byte - b'0') as u32 * weight;
        weight = if weight == max_weight { 2 } else { weight + 1 };
    }

    match sum % 11 {
        0 | 1 => 0,
        remainder => (11 - remainder) as u8,
    }
}

// =============================================================================
// Field Helpers
// =============================================================================

fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Keeps only digits and forces the result to `width`: zero-padded on the
/// left, or reduced to its rightmost `width` digits.
fn fit_digits(text: &str, width: usize) -> String {
    let digits = digits_only(text);
    if digits.len() > width {
        digits[digits.len() - width..].to_string()
    } else {
        format!("{:0>width$}", digits, width = width)
    }
}

/// IBGE state code for a federative unit abbreviation (case-insensitive).
///
/// ## Example
/// ```rust
/// use nfce_core::access_key::state_code_for_uf;
///
/// assert_eq!(state_code_for_uf("sp"), Some("35"));
/// assert_eq!(state_code_for_uf("XX"), None);
/// ```
pub fn state_code_for_uf(uf: &str) -> Option<&'static str> {
    let code = match uf.trim().to_ascii_uppercase().as_str() {
        "RO" => "11",
        "AC" => "12",
        "AM" => "13",
        "RR" => "14",
        "PA" => "15",
        "AP" => "16",
        "TO" => "17",
        "MA" => "21",
        "PI" => "22",
        "CE" => "23",
        "RN" => "24",
        "PB" => "25",
        "PE" => "26",
        "AL" => "27",
        "SE" => "28",
        "BA" => "29",
        "MG" => "31",
        "ES" => "32",
        "RJ" => "33",
        "SP" => "35",
        "PR" => "41",
        "SC" => "42",
        "RS" => "43",
        "MS" => "50",
        "MT" => "51",
        "GO" => "52",
        "DF" => "53",
        _ => return None,
    };
    Some(code)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request() -> AccessKeyRequest {
        AccessKeyRequest {
            state_code: "35".to_string(),
            cnpj: "12.345.678/0001-95".to_string(),
            series: "1".to_string(),
            number: "123".to_string(),
            emission_type: "1".to_string(),
            emission_date: NaiveDate::from_ymd_opt(2024, 10, 15),
        }
    }

    #[test]
    fn test_known_key() {
        let key = build_access_key(&request(), &mut FixedNonce(12345678));
        assert_eq!(key.as_str(), "35241012345678000195650010000001231123456783");
        assert_eq!(key.check_digit(), 3);
        assert_eq!(key.cnpj(), "12345678000195");
        assert_eq!(key.year_month(), "2410");
    }

    #[test]
    fn test_nonce_changes_check_digit() {
        let key = build_access_key(&request(), &mut FixedNonce(87654321));
        assert_eq!(key.as_str(), "35241012345678000195650010000001231876543217");
    }

    #[test]
    fn test_remainder_one_gives_zero() {
        // weighted sum of this body is 474, 474 % 11 == 1
        let key = build_access_key(&request(), &mut FixedNonce(3));
        assert_eq!(key.body(), "3524101234567800019565001000000123100000003");
        assert_eq!(key.check_digit(), 0);
    }

    #[test]
    fn test_short_cnpj_is_zero_padded() {
        let mut req = request();
        req.cnpj = "123".to_string();
        let identity = FiscalIdentity::resolve(&req, &mut FixedNonce(0));
        assert_eq!(identity.cnpj, "00000000000123");
        assert_eq!(identity.body().len(), ACCESS_KEY_BODY_LENGTH);
    }

    #[test]
    fn test_long_fields_keep_rightmost_digits() {
        let mut req = request();
        req.number = "1234567890".to_string();
        req.series = "98765".to_string();
        req.state_code = "135".to_string();
        let identity = FiscalIdentity::resolve(&req, &mut FixedNonce(0));
        assert_eq!(identity.number, "234567890");
        assert_eq!(identity.series, "765");
        assert_eq!(identity.state_code, "35");
        assert_eq!(identity.body().len(), ACCESS_KEY_BODY_LENGTH);
    }

    #[test]
    fn test_missing_date_uses_today() {
        let mut req = request();
        req.emission_date = None;
        let key = build_access_key(&req, &mut FixedNonce(1));
        let today = Local::now().date_naive().format("%y%m").to_string();
        assert_eq!(key.year_month(), today);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let a = build_access_key(&request(), &mut StdRng::seed_from_u64(7));
        let b = build_access_key(&request(), &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), ACCESS_KEY_LENGTH);
        assert!(AccessKey::parse(a.as_str()).is_ok());
    }

    #[test]
    fn test_grouped() {
        let key = build_access_key(&request(), &mut FixedNonce(12345678));
        assert_eq!(
            key.grouped(),
            "3524 1012 3456 7800 0195 6500 1000 0001 2311 2345 6783"
        );
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert!(AccessKey::parse("1234").is_err());
        assert!(AccessKey::parse(&"a".repeat(44)).is_err());
        assert!(AccessKey::parse("35241012345678000195650010000001231123456784").is_err());
        assert!(AccessKey::parse("35241012345678000195650010000001231123456783").is_ok());
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(state_code_for_uf("SP"), Some("35"));
        assert_eq!(state_code_for_uf(" mg "), Some("31"));
        assert_eq!(state_code_for_uf("DF"), Some("53"));
        assert_eq!(state_code_for_uf(""), None);
    }

    fn weighted_sum(body: &str) -> u32 {
        body.bytes()
            .rev()
            .zip([2u32, 3, 4, 5, 6, 7, 8, 9].iter().cycle())
            .map(|(b, w)| (b - b'0') as u32 * w)
            .sum()
    }

    proptest! {
        #[test]
        fn prop_check_digit_rule_holds(nonce in 0u32..100_000_000) {
            let key = build_access_key(&request(), &mut FixedNonce(nonce));
            prop_assert_eq!(key.as_str().len(), ACCESS_KEY_LENGTH);

            let remainder = weighted_sum(key.body()) % 11;
            let expected = if remainder <= 1 { 0 } else { 11 - remainder };
            prop_assert_eq!(key.check_digit() as u32, expected);
        }
    }
}
