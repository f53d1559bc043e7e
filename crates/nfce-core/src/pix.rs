//! # Pix Module
//!
//! Encodes the BR Code (EMV merchant-presented) payload behind a Pix QR code
//! and its "copia e cola" text.
//!
//! ## Payload Layout
//! ```text
//! ┌─────┬──────────────────────────────────────────────────────────────────┐
//! │ 00  │ "01"  payload format indicator                                   │
//! │ 26  │ ┌ 00 "br.gov.bcb.pix"                                            │
//! │     │ └ 01 sanitized key                                               │
//! │ 52  │ "0000" merchant category                                         │
//! │ 53  │ "986"  BRL                                                       │
//! │ 54  │ "10.00" amount (omitted when absent or zero)                     │
//! │ 58  │ "BR"                                                             │
//! │ 59  │ merchant name (≤ 25, upper, no diacritics, default RECEBEDOR)    │
//! │ 60  │ city (≤ 15, upper, no diacritics, default CIDADE)                │
//! │ 62  │ └ 05 txid or "***"                                               │
//! │ 63  │ CRC-16 of everything before it, "6304" included                  │
//! └─────┴──────────────────────────────────────────────────────────────────┘
//!   every field = tag ++ 2-digit length ++ value
//! ```
//!
//! Field order is fixed. The standard tolerates reordering, but some scanner
//! apps in the wild do not.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;
use tracing::debug;
use ts_rs::TS;

use crate::checksum::crc16;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// Globally unique identifier of the Pix arrangement.
pub const PIX_GUI: &str = "br.gov.bcb.pix";

const MAX_NAME_LEN: usize = 25;
const MAX_CITY_LEN: usize = 15;
const MAX_TXID_LEN: usize = 25;
const MAX_FIELD_LEN: usize = 99;
const DEFAULT_NAME: &str = "RECEBEDOR";
const DEFAULT_CITY: &str = "CIDADE";
const NO_TXID: &str = "***";
const BRAZIL_COUNTRY_CODE: &str = "55";
const CRC_FIELD_PREFIX: &str = "6304";

mod tag {
    pub const PAYLOAD_FORMAT: &str = "00";
    pub const MERCHANT_ACCOUNT: &str = "26";
    pub const ACCOUNT_GUI: &str = "00";
    pub const ACCOUNT_KEY: &str = "01";
    pub const CATEGORY: &str = "52";
    pub const CURRENCY: &str = "53";
    pub const AMOUNT: &str = "54";
    pub const COUNTRY: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const ADDITIONAL_DATA: &str = "62";
    pub const TXID: &str = "05";
}

// =============================================================================
// Key Type
// =============================================================================

/// Kind of Pix key registered by the merchant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PixKeyType {
    /// Mobile number, emitted as `+55DDDNUMBER`.
    Phone,
    /// Individual taxpayer id (11 digits).
    Cpf,
    /// Company taxpayer id (14 digits).
    Cnpj,
    Email,
    /// Random key (EVP), a UUID issued by the bank.
    Random,
}

impl PixKeyType {
    /// Normalizes a key as typed into the form for this key type.
    ///
    /// ## Example
    /// ```rust
    /// use nfce_core::pix::PixKeyType;
    ///
    /// assert_eq!(PixKeyType::Phone.sanitize("(11) 98765-4321"), "+5511987654321");
    /// assert_eq!(PixKeyType::Cpf.sanitize("123.456.789-01"), "12345678901");
    /// assert_eq!(PixKeyType::Email.sanitize(" Loja@Exemplo.COM "), "loja@exemplo.com");
    /// ```
    pub fn sanitize(&self, key: &str) -> String {
        match self {
            PixKeyType::Phone => {
                let digits = digits_only(key);
                if digits.is_empty() {
                    String::new()
                } else if digits.starts_with(BRAZIL_COUNTRY_CODE) && digits.len() >= 12 {
                    format!("+{}", digits)
                } else {
                    format!("+{}{}", BRAZIL_COUNTRY_CODE, digits)
                }
            }
            PixKeyType::Cpf | PixKeyType::Cnpj => digits_only(key),
            PixKeyType::Email => key.trim().to_lowercase(),
            PixKeyType::Random => key.trim().to_string(),
        }
    }
}

impl FromStr for PixKeyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "phone" | "telefone" | "celular" => Ok(PixKeyType::Phone),
            "cpf" => Ok(PixKeyType::Cpf),
            "cnpj" => Ok(PixKeyType::Cnpj),
            "email" | "e-mail" => Ok(PixKeyType::Email),
            "random" | "evp" | "aleatoria" | "aleatória" => Ok(PixKeyType::Random),
            other => Err(ValidationError::InvalidFormat {
                field: "pix key type".to_string(),
                reason: format!(
                    "unknown '{}'. Valid options: phone, cpf, cnpj, email, random",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Charge
// =============================================================================

/// Everything needed to produce one payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PixCharge {
    pub key: String,
    pub key_type: PixKeyType,
    pub merchant_name: String,
    pub city: String,
    /// Amount to charge; the payer types it when absent.
    pub amount: Option<Money>,
    pub txid: Option<String>,
}

impl PixCharge {
    /// Encodes this charge. See [`encode`].
    pub fn payload(&self) -> String {
        encode(
            &self.key,
            self.key_type,
            &self.merchant_name,
            &self.city,
            self.amount,
            self.txid.as_deref(),
        )
    }
}

/// Builds the BR Code payload string.
///
/// Returns an empty string when the key sanitizes to nothing (or is too long
/// to fit its field), so the host can show "configure a Pix key" instead of
/// an unreadable code.
///
/// ## Example
/// ```rust
/// use nfce_core::money::Money;
/// use nfce_core::pix::{encode, PixKeyType};
///
/// let payload = encode(
///     "12345678901",
///     PixKeyType::Cpf,
///     "Loja Teste",
///     "São Paulo",
///     Some(Money::from_cents(1000)),
///     None,
/// );
/// assert!(payload.starts_with("00020126330014br.gov.bcb.pix0111123456789015204000053039865405"));
/// assert_eq!(&payload[payload.len() - 8..], "63044D45");
/// ```
pub fn encode(
    merchant_key: &str,
    key_type: PixKeyType,
    merchant_name: &str,
    city: &str,
    amount: Option<Money>,
    transaction_id: Option<&str>,
) -> String {
    let key = key_type.sanitize(merchant_key);
    if key.is_empty() {
        debug!(?key_type, "pix key is empty, no payload");
        return String::new();
    }

    let mut account = String::new();
    push_field(&mut account, tag::ACCOUNT_GUI, PIX_GUI);
    push_field(&mut account, tag::ACCOUNT_KEY, &key);
    if account.chars().count() > MAX_FIELD_LEN {
        debug!(?key_type, key_len = key.chars().count(), "pix key too long, no payload");
        return String::new();
    }

    let mut additional = String::new();
    push_field(&mut additional, tag::TXID, &sanitize_txid(transaction_id));

    let mut payload = String::with_capacity(160);
    push_field(&mut payload, tag::PAYLOAD_FORMAT, "01");
    push_field(&mut payload, tag::MERCHANT_ACCOUNT, &account);
    push_field(&mut payload, tag::CATEGORY, "0000");
    push_field(&mut payload, tag::CURRENCY, "986");
    if let Some(amount) = amount.filter(Money::is_positive) {
        push_field(&mut payload, tag::AMOUNT, &amount.to_payload_string());
    }
    push_field(&mut payload, tag::COUNTRY, "BR");
    push_field(
        &mut payload,
        tag::MERCHANT_NAME,
        &sanitize_text(merchant_name, MAX_NAME_LEN, DEFAULT_NAME),
    );
    push_field(
        &mut payload,
        tag::MERCHANT_CITY,
        &sanitize_text(city, MAX_CITY_LEN, DEFAULT_CITY),
    );
    push_field(&mut payload, tag::ADDITIONAL_DATA, &additional);

    payload.push_str(CRC_FIELD_PREFIX);
    let checksum = crc16(payload.as_bytes());
    payload.push_str(&checksum);
    payload
}

/// Appends `tag ++ len ++ value`; the length counts characters.
fn push_field(out: &mut String, tag: &str, value: &str) {
    // Writing into a String cannot fail
    let _ = write!(out, "{}{:02}{}", tag, value.chars().count(), value);
}

// =============================================================================
// Sanitizers
// =============================================================================

fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Upper-cased printable ASCII, diacritics folded, cut to `max_len` chars.
fn sanitize_text(text: &str, max_len: usize, default: &str) -> String {
    let folded: String = text
        .chars()
        .map(fold_diacritic)
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let cut: String = folded.trim().chars().take(max_len).collect();
    let cut = cut.trim_end();

    if cut.is_empty() {
        default.to_string()
    } else {
        cut.to_string()
    }
}

/// ASCII alphanumerics only, at most 25 chars, `***` when nothing is left.
fn sanitize_txid(txid: Option<&str>) -> String {
    let cleaned: String = txid
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_TXID_LEN)
        .collect();

    if cleaned.is_empty() {
        NO_TXID.to_string()
    } else {
        cleaned
    }
}

/// Maps Portuguese (and common Latin-1) accented letters to their base letter.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        other => other,
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// One decoded tag-length-value field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TlvField {
    pub tag: String,
    pub value: String,
}

impl TlvField {
    /// Decodes the value as a nested TLV list (tags 26 and 62).
    pub fn nested(&self) -> CoreResult<Vec<TlvField>> {
        parse_tlv(&self.value)
    }
}

/// Splits a payload into its top-level fields.
///
/// ## Errors
/// [`CoreError::InvalidPayload`] when a header is truncated, a length is not
/// two digits, or a value runs past the end of the input.
pub fn parse_tlv(payload: &str) -> CoreResult<Vec<TlvField>> {
    let chars: Vec<char> = payload.chars().collect();
    let mut fields = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        if pos + 4 > chars.len() {
            return Err(invalid_payload(format!("truncated header at position {}", pos)));
        }

        let tag: String = chars[pos..pos + 2].iter().collect();
        let len_text: String = chars[pos + 2..pos + 4].iter().collect();
        let len: usize = len_text
            .parse()
            .map_err(|_| invalid_payload(format!("bad length '{}' for tag {}", len_text, tag)))?;

        let start = pos + 4;
        let end = start + len;
        if end > chars.len() {
            return Err(invalid_payload(format!("tag {} overruns payload", tag)));
        }

        fields.push(TlvField {
            tag,
            value: chars[start..end].iter().collect(),
        });
        pos = end;
    }

    Ok(fields)
}

/// Checks that the payload ends in a CRC field matching its content.
///
/// ## Example
/// ```rust
/// use nfce_core::pix::verify_crc;
///
/// let sample = "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-426655440000\
///               5204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***63041D3D";
/// assert!(verify_crc(sample));
/// assert!(!verify_crc(&sample.replace("BRASILIA", "BRASILIO")));
/// ```
pub fn verify_crc(payload: &str) -> bool {
    if !payload.is_ascii() || payload.len() < CRC_FIELD_PREFIX.len() + 4 {
        return false;
    }

    let (covered, given) = payload.split_at(payload.len() - 4);
    covered.ends_with(CRC_FIELD_PREFIX) && crc16(covered.as_bytes()).eq_ignore_ascii_case(given)
}

fn invalid_payload(reason: String) -> CoreError {
    CoreError::InvalidPayload { reason }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field<'a>(fields: &'a [TlvField], tag: &str) -> Option<&'a str> {
        fields.iter().find(|f| f.tag == tag).map(|f| f.value.as_str())
    }

    #[test]
    fn test_cpf_charge_with_amount() {
        let payload = encode(
            "12345678901",
            PixKeyType::Cpf,
            "LOJA TESTE",
            "SAO PAULO",
            Some(Money::from_cents(1000)),
            None,
        );
        assert_eq!(
            payload,
            "00020126330014br.gov.bcb.pix0111123456789015204000053039865405\
             10.005802BR5910LOJA TESTE6009SAO PAULO62070503***63044D45"
        );
    }

    #[test]
    fn test_absent_amount_drops_only_tag_54() {
        let with_amount = encode(
            "12345678901",
            PixKeyType::Cpf,
            "LOJA TESTE",
            "SAO PAULO",
            Some(Money::from_cents(1000)),
            None,
        );
        let without = encode("12345678901", PixKeyType::Cpf, "LOJA TESTE", "SAO PAULO", None, None);

        assert_eq!(
            without,
            "00020126330014br.gov.bcb.pix0111123456789015204000053039865802BR\
             5910LOJA TESTE6009SAO PAULO62070503***630414D5"
        );
        let body = |p: &str| p[..p.len() - 4].replace("540510.00", "");
        assert_eq!(body(&with_amount), body(&without));
        assert_ne!(&with_amount[with_amount.len() - 4..], &without[without.len() - 4..]);
    }

    #[test]
    fn test_zero_amount_is_omitted() {
        let zero = encode("12345678901", PixKeyType::Cpf, "LOJA TESTE", "SAO PAULO", Some(Money::zero()), None);
        let none = encode("12345678901", PixKeyType::Cpf, "LOJA TESTE", "SAO PAULO", None, None);
        assert_eq!(zero, none);
    }

    #[test]
    fn test_random_key_sample() {
        // Central bank static sample with the name upper-cased as we emit it
        let payload = encode(
            " 123e4567-e12b-12d1-a456-426655440000 ",
            PixKeyType::Random,
            "Fulano de Tal",
            "Brasília",
            None,
            None,
        );
        assert_eq!(
            payload,
            "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-426655440000\
             5204000053039865802BR5913FULANO DE TAL6008BRASILIA62070503***6304F012"
        );
    }

    #[test]
    fn test_phone_key_with_txid() {
        let payload = encode(
            "(11) 98765-4321",
            PixKeyType::Phone,
            "Posto São João",
            "São João del Rei",
            Some(Money::from_cents(12345)),
            Some("NFCE-000123"),
        );
        assert_eq!(
            payload,
            "00020126360014br.gov.bcb.pix0114+5511987654321520400005303986\
             5406123.455802BR5914POSTO SAO JOAO6015SAO JOAO DEL RE\
             62140510NFCE00012363043982"
        );
    }

    #[test]
    fn test_long_name_truncated_before_length() {
        let payload = encode(
            "12.345.678/0001-95",
            PixKeyType::Cnpj,
            "Auto Posto Irmãos Carvalho Ltda",
            "Campinas",
            Some(Money::from_cents(25000)),
            None,
        );
        assert!(payload.contains("5925AUTO POSTO IRMAOS CARVALH6008CAMPINAS"));
        assert!(payload.ends_with("D070"));
    }

    #[test]
    fn test_defaults_for_blank_name_and_city() {
        let payload = encode("Loja@Exemplo.com", PixKeyType::Email, "  ", "", None, None);
        assert_eq!(
            payload,
            "00020126380014br.gov.bcb.pix0116loja@exemplo.com5204000053039865802BR\
             5909RECEBEDOR6006CIDADE62070503***6304AE28"
        );
    }

    #[test]
    fn test_empty_key_gives_empty_payload() {
        assert_eq!(encode("", PixKeyType::Random, "LOJA", "SP", None, None), "");
        assert_eq!(encode("   ", PixKeyType::Email, "LOJA", "SP", None, None), "");
        assert_eq!(encode("abc", PixKeyType::Cpf, "LOJA", "SP", None, None), "");
        assert_eq!(encode("-", PixKeyType::Phone, "LOJA", "SP", None, None), "");
    }

    #[test]
    fn test_oversized_key_gives_empty_payload() {
        let key = "x".repeat(78);
        assert_eq!(encode(&key, PixKeyType::Random, "LOJA", "SP", None, None), "");
        let key = "x".repeat(77);
        assert!(!encode(&key, PixKeyType::Random, "LOJA", "SP", None, None).is_empty());
    }

    #[test]
    fn test_phone_sanitize() {
        assert_eq!(PixKeyType::Phone.sanitize("+55 11 98765-4321"), "+5511987654321");
        assert_eq!(PixKeyType::Phone.sanitize("11987654321"), "+5511987654321");
        // a DDD of 55 (Rio Grande do Sul) is not mistaken for the country code
        assert_eq!(PixKeyType::Phone.sanitize("55991234567"), "+5555991234567");
        assert_eq!(PixKeyType::Random.sanitize(" EVP "), "EVP");
    }

    #[test]
    fn test_txid_sanitize() {
        assert_eq!(sanitize_txid(None), "***");
        assert_eq!(sanitize_txid(Some("")), "***");
        assert_eq!(sanitize_txid(Some("--")), "***");
        assert_eq!(sanitize_txid(Some("abc-123")), "abc123");
        assert_eq!(sanitize_txid(Some(&"A".repeat(40))).len(), MAX_TXID_LEN);
    }

    #[test]
    fn test_key_type_from_str() {
        assert_eq!("CPF".parse::<PixKeyType>().unwrap(), PixKeyType::Cpf);
        assert_eq!("telefone".parse::<PixKeyType>().unwrap(), PixKeyType::Phone);
        assert_eq!("evp".parse::<PixKeyType>().unwrap(), PixKeyType::Random);
        assert!("iban".parse::<PixKeyType>().is_err());
    }

    #[test]
    fn test_parse_tlv_nested() {
        let payload = encode("12345678901", PixKeyType::Cpf, "LOJA TESTE", "SAO PAULO", None, Some("TX1"));
        let fields = parse_tlv(&payload).unwrap();
        let tags: Vec<&str> = fields.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(tags, ["00", "26", "52", "53", "58", "59", "60", "62", "63"]);

        let account = fields[1].nested().unwrap();
        assert_eq!(field(&account, "00"), Some(PIX_GUI));
        assert_eq!(field(&account, "01"), Some("12345678901"));
        assert_eq!(field(&fields[7].nested().unwrap(), "05"), Some("TX1"));
    }

    #[test]
    fn test_parse_tlv_rejects_garbage() {
        assert!(parse_tlv("000").is_err());
        assert!(parse_tlv("00AB01").is_err());
        assert!(parse_tlv("000501").is_err());
        assert!(parse_tlv("").unwrap().is_empty());
    }

    #[test]
    fn test_verify_crc() {
        let payload = encode("12345678901", PixKeyType::Cpf, "LOJA TESTE", "SAO PAULO", None, None);
        assert!(verify_crc(&payload));
        assert!(!verify_crc(&payload.replace("SAO PAULO", "SAO PAULA")));
        assert!(!verify_crc("63041D3D"));
        assert!(!verify_crc(""));
    }

    proptest! {
        #[test]
        fn prop_every_length_prefix_matches(
            name in "\\PC{0,40}",
            city in "\\PC{0,30}",
            cents in proptest::option::of(0i64..100_000_000),
            txid in proptest::option::of("[ -~]{0,40}"),
        ) {
            let payload = encode(
                "123.456.789-01",
                PixKeyType::Cpf,
                &name,
                &city,
                cents.map(Money::from_cents),
                txid.as_deref(),
            );

            prop_assert!(payload.is_ascii());
            prop_assert!(verify_crc(&payload));

            // parse_tlv consumes the whole string only if every prefix is exact
            let fields = parse_tlv(&payload).unwrap();
            prop_assert_eq!(fields.last().map(|f| f.tag.as_str()), Some("63"));

            let name_len = field(&fields, "59").map(str::len).unwrap_or(0);
            let city_len = field(&fields, "60").map(str::len).unwrap_or(0);
            prop_assert!((1..=MAX_NAME_LEN).contains(&name_len));
            prop_assert!((1..=MAX_CITY_LEN).contains(&city_len));

            for f in fields.iter().filter(|f| f.tag == "26" || f.tag == "62") {
                prop_assert!(f.nested().is_ok());
            }
        }
    }
}
