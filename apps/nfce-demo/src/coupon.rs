//! # Coupon Pipeline
//!
//! Runs one sale through the core: totals, access key, Pix payload.
//!
//! ## Startup to Coupon
//! ```text
//! StationProfile + CouponRequest
//!      │
//!      ▼
//! find_fuel ──► LineItem ──► calculate_receipt ──► ReceiptCalculation
//!      │
//!      ▼
//! build_access_key (nonce from the injected rng)
//!      │
//!      ▼
//! Pix? ──► PixCharge { amount = amount due, txid = uuid } ──► payload
//!      │
//!      ▼
//! Coupon (rendered as text or JSON)
//! ```

use chrono::NaiveDateTime;
use nfce_core::access_key::{build_access_key, AccessKey, AccessKeyRequest};
use nfce_core::pix::PixCharge;
use nfce_core::{calculate_receipt, LineItem, PaymentMethod, Quantity, ReceiptCalculation};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Builder;

use crate::config::{StationConfig, StationProfile};
use crate::error::{AppError, AppResult};

/// One sale as requested on the command line.
#[derive(Debug, Clone)]
pub struct CouponRequest {
    /// Fuel code or name prefix.
    pub fuel: String,
    pub liters: Quantity,
    pub payment: PaymentMethod,
    pub issued_at: NaiveDateTime,
}

/// Everything printed on one coupon.
#[derive(Debug, Clone, Serialize)]
pub struct Coupon {
    pub station: StationConfig,
    pub series: u32,
    pub number: u64,
    pub issued_at: NaiveDateTime,
    pub receipt: ReceiptCalculation,
    pub access_key: AccessKey,
    /// Present only for Pix payments with a configured key.
    pub pix: Option<PixCharge>,
    pub pix_payload: Option<String>,
}

/// Issues a coupon.
///
/// `rng` supplies the access key nonce and the Pix transaction id, so a
/// seeded generator reproduces the same coupon.
pub fn issue_coupon<R: Rng>(
    profile: &StationProfile,
    request: &CouponRequest,
    rng: &mut R,
) -> AppResult<Coupon> {
    if request.liters.thousandths() <= 0 {
        return Err(AppError::InvalidInput(format!(
            "liters must be greater than zero, got {}",
            request.liters
        )));
    }

    let fuel = profile.find_fuel(&request.fuel)?;
    let item = LineItem {
        code: fuel.code.clone(),
        description: fuel.name.clone(),
        quantity: request.liters,
        price: fuel.price(),
    };

    let rates = profile.taxes.rate_set();
    let receipt = calculate_receipt(std::slice::from_ref(&item), request.payment, &rates);

    let state_code = profile.state_code().ok_or_else(|| {
        AppError::InvalidConfig(format!("unknown state '{}'", profile.station.state))
    })?;

    let key_request = AccessKeyRequest {
        state_code: state_code.to_string(),
        cnpj: profile.station.cnpj.clone(),
        series: profile.fiscal.series.to_string(),
        number: profile.fiscal.number.to_string(),
        emission_type: profile.fiscal.emission_type.to_string(),
        emission_date: Some(request.issued_at.date()),
    };
    let access_key = build_access_key(&key_request, rng);

    let (pix, pix_payload) = if request.payment.is_instant_transfer() {
        let txid = Builder::from_random_bytes(rng.gen()).into_uuid().simple().to_string();
        let charge = PixCharge {
            key: profile.pix.key.clone(),
            key_type: profile.pix.key_type,
            merchant_name: profile.station.name.clone(),
            city: profile.station.city.clone(),
            amount: Some(receipt.amount_due()),
            txid: Some(txid),
        };

        let payload = charge.payload();
        if payload.is_empty() {
            warn!("Pix key not configured, printing coupon without payment code");
            (None, None)
        } else {
            (Some(charge), Some(payload))
        }
    } else {
        (None, None)
    };

    info!(
        fuel = %item.code,
        liters = %request.liters,
        payment = %request.payment,
        amount = %receipt.amount_due(),
        key = %access_key,
        "Coupon issued"
    );

    Ok(Coupon {
        station: profile.station.clone(),
        series: profile.fiscal.series,
        number: profile.fiscal.number,
        issued_at: request.issued_at,
        receipt,
        access_key,
        pix,
        pix_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use nfce_core::pix::verify_crc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn request(fuel: &str, liters: &str, payment: PaymentMethod) -> CouponRequest {
        CouponRequest {
            fuel: fuel.to_string(),
            liters: Quantity::parse_locale(liters),
            payment,
            issued_at: NaiveDate::from_ymd_opt(2024, 10, 15)
                .and_then(|d| d.and_hms_opt(14, 30, 0))
                .unwrap(),
        }
    }

    #[test]
    fn test_pix_coupon() {
        let profile = StationProfile::default();
        let mut rng = StdRng::seed_from_u64(7);

        let coupon = issue_coupon(&profile, &request("1", "40", PaymentMethod::Pix), &mut rng).unwrap();

        assert_eq!(coupon.receipt.subtotal.cents(), 23560);
        assert!(coupon.access_key.as_str().starts_with("352410"));
        let payload = coupon.pix_payload.unwrap();
        assert!(payload.contains("5406235.60"));
        assert!(verify_crc(&payload));
    }

    #[test]
    fn test_cash_coupon_has_no_pix() {
        let profile = StationProfile::default();
        let mut rng = StdRng::seed_from_u64(7);

        let coupon = issue_coupon(&profile, &request("1", "40", PaymentMethod::Cash), &mut rng).unwrap();

        assert_eq!(coupon.receipt.subtotal.cents(), 23160);
        assert!(coupon.pix.is_none());
        assert!(coupon.pix_payload.is_none());
    }

    #[test]
    fn test_same_seed_same_coupon() {
        let profile = StationProfile::default();
        let req = request("2", "10,5", PaymentMethod::Pix);

        let a = issue_coupon(&profile, &req, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = issue_coupon(&profile, &req, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(a.access_key, b.access_key);
        assert_eq!(a.pix_payload, b.pix_payload);
    }

    #[test]
    fn test_missing_pix_key_prints_without_code() {
        let mut profile = StationProfile::default();
        profile.pix.key = "  ".to_string();

        let coupon = issue_coupon(
            &profile,
            &request("1", "10", PaymentMethod::Pix),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(coupon.pix_payload.is_none());
    }

    #[test]
    fn test_zero_liters_rejected() {
        let profile = StationProfile::default();
        let err = issue_coupon(
            &profile,
            &request("1", "0", PaymentMethod::Cash),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
