// src/api/webhooks.rs
//
// Inbound payment gateway events. Deliveries are unordered relative to the
// request path and may repeat; everything here is written so a redelivered
// event is a no-op and an event we do not understand still gets a 200 —
// error responses only invite redelivery storms.

use actix_web::{post, web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

use crate::gateway::verify_webhook_signature;
use crate::payments::{self, EventKind, PaymentEvent, ReconcileOutcome};
use crate::AppState;

/// The payload reduced to the handful of fields reconciliation needs,
/// whatever shape the gateway delivered it in.
#[derive(Debug, Default)]
pub struct NormalizedEvent {
    pub event_type: Option<String>,
    pub gateway_ref: Option<String>,
    pub transaction_id: Option<i32>,
    pub status: Option<String>,
}

/// Accepts JSON object bodies and form-encoded bodies.
pub fn parse_webhook_body(body: &[u8]) -> Option<Value> {
    if let Ok(v) = serde_json::from_slice::<Value>(body) {
        if v.is_object() {
            return Some(v);
        }
    }

    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
        Ok(pairs) if !pairs.is_empty() => {
            let mut map = serde_json::Map::new();
            for (k, v) in pairs {
                map.insert(k, Value::String(v));
            }
            Some(Value::Object(map))
        }
        _ => None,
    }
}

fn string_at(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| v.get(k).and_then(Value::as_str))
        .map(str::to_string)
}

fn transaction_id_from(v: &Value) -> Option<i32> {
    let id = v.get("metadata")?.get("transaction_id")?;
    if let Some(n) = id.as_i64() {
        return i32::try_from(n).ok();
    }
    id.as_str()?.parse().ok()
}

pub fn normalize_payload(raw: Value) -> NormalizedEvent {
    let data = raw.get("data").cloned().unwrap_or(Value::Null);

    let event_type = string_at(&raw, &["type", "eventType", "event_type"]);
    let gateway_ref = string_at(&data, &["id"])
        .or_else(|| string_at(&raw, &["objectId", "object_id", "id"]));
    let status = string_at(&data, &["status"]).or_else(|| string_at(&raw, &["status"]));
    let transaction_id = transaction_id_from(&data).or_else(|| transaction_id_from(&raw));

    NormalizedEvent {
        event_type,
        gateway_ref,
        transaction_id,
        status,
    }
}

fn is_failed(n: &NormalizedEvent) -> bool {
    if matches!(
        n.event_type.as_deref(),
        Some("payment.failed") | Some("payment_intent.payment_failed")
    ) {
        return true;
    }
    matches!(
        n.status.as_deref(),
        Some("failed") | Some("fail") | Some("canceled")
    )
}

fn is_succeeded(n: &NormalizedEvent) -> bool {
    if matches!(
        n.event_type.as_deref(),
        Some("payment.succeeded") | Some("payment.success") | Some("payment_intent.succeeded")
    ) {
        return true;
    }
    matches!(
        n.status.as_deref(),
        Some("succeeded") | Some("success") | Some("completed") | Some("paid")
    )
}

pub fn classify(n: &NormalizedEvent) -> PaymentEvent {
    let kind = if is_failed(n) {
        EventKind::PaymentFailed
    } else if is_succeeded(n) {
        EventKind::PaymentSucceeded
    } else {
        EventKind::Unrecognized
    };

    PaymentEvent {
        kind,
        gateway_ref: n.gateway_ref.clone(),
        transaction_id: n.transaction_id,
    }
}

pub fn extract_signature(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("X-Signature")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

pub fn extract_api_key(req: &HttpRequest, payload: &Value) -> Option<String> {
    if let Some(key) = req.headers().get("X-Api-Key").and_then(|h| h.to_str().ok()) {
        return Some(key.to_string());
    }
    payload
        .get("apiKey")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[utoipa::path(
    post,
    path = "/webhooks/payments",
    responses(
        (status = 200, description = "Event applied, repeated, or deliberately ignored"),
        (status = 401, description = "Bad signature or API key")
    ),
    tag = "webhooks"
)]
#[post("/webhooks/payments")]
pub async fn payment_webhook(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let Some(raw) = parse_webhook_body(&body) else {
        return HttpResponse::BadRequest().json(json!({ "error": "unreadable payload" }));
    };

    let authorized = if let Some(signature) = extract_signature(&req) {
        !state.webhook_secret.is_empty()
            && verify_webhook_signature(&state.webhook_secret, &body, &signature)
    } else {
        extract_api_key(&req, &raw).is_some_and(|key| key == state.webhook_key)
    };

    if !authorized {
        return HttpResponse::Unauthorized().json(json!({ "error": "bad webhook credentials" }));
    }

    let normalized = normalize_payload(raw);
    let event = classify(&normalized);

    match payments::reconcile(&state.pool, &event).await {
        Ok(ReconcileOutcome::Applied(status)) => {
            HttpResponse::Ok().json(json!({ "ok": true, "status": status.as_str() }))
        }
        Ok(ReconcileOutcome::AlreadySettled) => {
            HttpResponse::Ok().json(json!({ "ok": true, "idempotent": true }))
        }
        Ok(ReconcileOutcome::Unmatched) | Ok(ReconcileOutcome::Ignored) => {
            // Unknown reference or unknown kind: acknowledged so the gateway
            // stops redelivering.
            HttpResponse::Ok().json(json!({ "ok": true, "ignored": true }))
        }
        Err(e) => {
            log::error!("webhook reconcile error: {e:?}");
            HttpResponse::InternalServerError().finish()
        }
    }
}
