//! End-to-end coupon pipeline: totals → access key → Pix payload.

use chrono::NaiveDate;
use nfce_core::access_key::{build_access_key, AccessKey, AccessKeyRequest, FixedNonce};
use nfce_core::pix::{parse_tlv, verify_crc, PixCharge, PixKeyType};
use nfce_core::{
    calculate_receipt, mask_from_digit_stream, FuelPrice, LineItem, Money, PaymentMethod,
    Quantity, TaxRateSet,
};

fn station_request() -> AccessKeyRequest {
    AccessKeyRequest {
        state_code: "35".to_string(),
        cnpj: "12.345.678/0001-95".to_string(),
        series: "1".to_string(),
        number: "123".to_string(),
        emission_type: "1".to_string(),
        emission_date: NaiveDate::from_ymd_opt(2024, 10, 15),
    }
}

fn diesel(liters: &str) -> LineItem {
    LineItem {
        code: "3".to_string(),
        description: "OLEO DIESEL S10".to_string(),
        quantity: Quantity::parse_locale(liters),
        price: FuelPrice::parse_locale("6,15", "6,25"),
    }
}

#[test]
fn test_pix_coupon_end_to_end() {
    let rates = TaxRateSet::parse("13,45", "18", "0,75");
    let receipt = calculate_receipt(&[diesel("40,000")], PaymentMethod::Pix, &rates);

    assert_eq!(receipt.subtotal.to_string(), "R$ 250,00");
    assert_eq!(receipt.taxes.federal.to_string(), "R$ 33,63");
    assert_eq!(receipt.taxes.state.to_string(), "R$ 45,00");
    assert_eq!(receipt.taxes.municipal.to_string(), "R$ 1,88");

    let key = build_access_key(&station_request(), &mut FixedNonce(12_345_678));
    assert_eq!(key.as_str(), "35241012345678000195650010000001231123456783");
    assert_eq!(
        key.grouped(),
        "3524 1012 3456 7800 0195 6500 1000 0001 2311 2345 6783"
    );

    let charge = PixCharge {
        key: "+55 11 98765-4321".to_string(),
        key_type: PixKeyType::Phone,
        merchant_name: "Posto São João".to_string(),
        city: "São João del Rei".to_string(),
        amount: Some(Money::from_cents(12345)),
        txid: Some("NFCE-000123".to_string()),
    };
    let payload = charge.payload();
    assert_eq!(
        payload,
        "00020126360014br.gov.bcb.pix0114+5511987654321520400005303986\
         5406123.455802BR5914POSTO SAO JOAO6015SAO JOAO DEL RE\
         62140510NFCE00012363043982"
    );
    assert!(verify_crc(&payload));
}

#[test]
fn test_payload_amount_matches_receipt() {
    let rates = TaxRateSet::default();
    let receipt = calculate_receipt(&[diesel("12,345")], PaymentMethod::Pix, &rates);

    let payload = PixCharge {
        key: "123.456.789-01".to_string(),
        key_type: PixKeyType::Cpf,
        merchant_name: "Loja Teste".to_string(),
        city: "Sao Paulo".to_string(),
        amount: Some(receipt.amount_due()),
        txid: None,
    }
    .payload();

    let fields = parse_tlv(&payload).unwrap();
    let amount = fields.iter().find(|f| f.tag == "54").unwrap();
    // 12,345 L × 6,25 = 77,15625 → 77,16
    assert_eq!(amount.value, "77.16");
    assert!(verify_crc(&payload));
}

#[test]
fn test_cash_coupon_has_no_payload_need() {
    let rates = TaxRateSet::parse("13,45", "18", "0,75");
    let receipt = calculate_receipt(&[diesel("40")], PaymentMethod::Cash, &rates);
    assert_eq!(receipt.subtotal.cents(), 24600);
    assert!(!receipt.payment_method.is_instant_transfer());
}

#[test]
fn test_generated_key_round_trips_through_parse() {
    let mut rng = rand::thread_rng();
    let key = build_access_key(&station_request(), &mut rng);
    let parsed = AccessKey::parse(&key.grouped()).unwrap();
    assert_eq!(parsed, key);
}

#[test]
fn test_masked_amount_feeds_payload() {
    let masked = mask_from_digit_stream("1000", 2);
    assert_eq!(masked, "10,00");

    let payload = PixCharge {
        key: "12345678901".to_string(),
        key_type: PixKeyType::Cpf,
        merchant_name: "Loja Teste".to_string(),
        city: "São Paulo".to_string(),
        amount: Some(Money::parse_locale(&masked)),
        txid: None,
    }
    .payload();
    assert!(payload.ends_with("63044D45"));
}
