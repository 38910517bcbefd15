use payments_engine::domain::payment::CreatePaymentRequest;
use payments_engine::service::admission::request_fingerprint;

#[test]
fn identical_requests_share_a_fingerprint() {
    let a = CreatePaymentRequest {
        amount_minor: 12_500,
        currency: "EUR".to_string(),
    };
    let b = CreatePaymentRequest {
        amount_minor: 12_500,
        currency: "EUR".to_string(),
    };
    assert_eq!(request_fingerprint(&a), request_fingerprint(&b));
}

#[test]
fn different_amount_changes_the_fingerprint() {
    let a = CreatePaymentRequest {
        amount_minor: 12_500,
        currency: "EUR".to_string(),
    };
    let b = CreatePaymentRequest {
        amount_minor: 12_501,
        currency: "EUR".to_string(),
    };
    assert_ne!(request_fingerprint(&a), request_fingerprint(&b));
}

#[test]
fn different_currency_changes_the_fingerprint() {
    let a = CreatePaymentRequest {
        amount_minor: 12_500,
        currency: "EUR".to_string(),
    };
    let b = CreatePaymentRequest {
        amount_minor: 12_500,
        currency: "USD".to_string(),
    };
    assert_ne!(request_fingerprint(&a), request_fingerprint(&b));
}

#[test]
fn fingerprint_is_hex_sha256() {
    let req = CreatePaymentRequest {
        amount_minor: 1,
        currency: "EUR".to_string(),
    };
    let fp = request_fingerprint(&req);
    assert_eq!(fp.len(), 64);
    assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
}
