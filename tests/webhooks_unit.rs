use actix_web::test::TestRequest;
use serde_json::json;

use podm::api::webhooks::{classify, extract_api_key, normalize_payload, parse_webhook_body};
use podm::gateway::{sign_hmac_sha256_hex, verify_webhook_signature};
use podm::payments::EventKind;

#[test]
fn normalize_payment_success_example() {
    let raw = json!({
        "type": "payment.succeeded",
        "data": {
            "id": "pi_8f1f6f0e",
            "status": "succeeded",
            "metadata": { "transaction_id": 42 }
        }
    });

    let normalized = normalize_payload(raw);
    assert_eq!(normalized.event_type.as_deref(), Some("payment.succeeded"));
    assert_eq!(normalized.gateway_ref.as_deref(), Some("pi_8f1f6f0e"));
    assert_eq!(normalized.transaction_id, Some(42));
    assert_eq!(normalized.status.as_deref(), Some("succeeded"));
    assert_eq!(classify(&normalized).kind, EventKind::PaymentSucceeded);
}

#[test]
fn parse_form_payload() {
    let body = b"id=pi_abc&status=completed&eventType=payment.success";
    let raw = parse_webhook_body(body).expect("parse form");
    let normalized = normalize_payload(raw);

    assert_eq!(normalized.gateway_ref.as_deref(), Some("pi_abc"));
    assert_eq!(normalized.status.as_deref(), Some("completed"));
    assert_eq!(normalized.event_type.as_deref(), Some("payment.success"));
    assert_eq!(classify(&normalized).kind, EventKind::PaymentSucceeded);
}

#[test]
fn metadata_transaction_id_accepts_string() {
    let raw = json!({
        "type": "payment.failed",
        "data": {
            "id": "pi_x",
            "metadata": { "transaction_id": "7" }
        }
    });

    let normalized = normalize_payload(raw);
    assert_eq!(normalized.transaction_id, Some(7));
    assert_eq!(classify(&normalized).kind, EventKind::PaymentFailed);
}

#[test]
fn unrecognized_event_kind_is_not_an_error() {
    let raw = json!({
        "type": "customer.updated",
        "data": { "id": "cus_1" }
    });

    let normalized = normalize_payload(raw);
    assert_eq!(classify(&normalized).kind, EventKind::Unrecognized);
}

#[test]
fn garbage_body_does_not_parse() {
    assert!(parse_webhook_body(b"").is_none());
}

#[test]
fn extract_api_key_from_header() {
    let req = TestRequest::default()
        .insert_header(("X-Api-Key", "secret"))
        .to_http_request();
    let payload = json!({});
    let key = extract_api_key(&req, &payload);
    assert_eq!(key.as_deref(), Some("secret"));
}

#[test]
fn extract_api_key_from_payload() {
    let req = TestRequest::default().to_http_request();
    let payload = json!({ "apiKey": "from-body" });
    let key = extract_api_key(&req, &payload);
    assert_eq!(key.as_deref(), Some("from-body"));
}

#[test]
fn signature_roundtrip() {
    let body = br#"{"type":"payment.succeeded"}"#;
    let signature = sign_hmac_sha256_hex("whsec_123", body);

    assert!(verify_webhook_signature("whsec_123", body, &signature));
    assert!(!verify_webhook_signature("other-secret", body, &signature));
    assert!(!verify_webhook_signature("whsec_123", b"tampered", &signature));
    assert!(!verify_webhook_signature("whsec_123", body, "not-hex"));
}
