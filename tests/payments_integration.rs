use actix_web::{test, web, App};
use serde_json::json;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

use podm::api::webhooks::payment_webhook;
use podm::error::ServiceError;
use podm::fees::BillingConfig;
use podm::models::{CallerContext, Role, TransactionStatus};
use podm::payments::{self, EventKind, PaymentEvent, ReconcileOutcome};

mod support;
use support::MockGateway;

#[actix_web::test]
async fn tip_creates_pending_tx_and_webhook_clears_it_once() {
    let Some(test_db) = support::try_init_test_db().await else {
        return;
    };
    let pool = &test_db.pool;
    let suffix = Uuid::new_v4().to_string();

    let fan = support::insert_user(pool, &format!("fan_{suffix}"), "fan", Some("cus_fan"), None).await;
    let creator = support::insert_user(
        pool,
        &format!("creator_{suffix}"),
        "creator",
        None,
        Some("acct_creator"),
    )
    .await;

    let gateway = MockGateway::new();
    let caller = CallerContext {
        id: fan,
        role: Role::Fan,
    };
    let cfg = BillingConfig::default();

    let initiated = payments::initiate_tip(
        pool,
        &gateway,
        &cfg,
        &caller,
        creator,
        1000,
        Some("love the channel"),
    )
    .await
    .expect("initiate tip");

    let row = sqlx::query(
        r#"SELECT status, gross_minor, fee_minor, payout_minor, gateway_ref
           FROM transactions
           WHERE id = $1"#,
    )
    .bind(initiated.transaction_id)
    .fetch_one(pool)
    .await
    .expect("select tx");
    assert_eq!(row.get::<String, _>("status"), "pending");
    assert_eq!(row.get::<i64, _>("gross_minor"), 1000);
    assert_eq!(row.get::<i64, _>("fee_minor"), 125);
    assert_eq!(row.get::<i64, _>("payout_minor"), 875);
    assert_eq!(
        row.get::<Option<String>, _>("gateway_ref").as_deref(),
        Some(initiated.gateway_ref.as_str())
    );

    // the tip note became a direct message
    let notes: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM messages WHERE sender_id = $1 AND recipient_id = $2",
    )
    .bind(fan)
    .bind(creator)
    .fetch_one(pool)
    .await
    .expect("count notes")
    .get("n");
    assert_eq!(notes, 1);

    let event = PaymentEvent {
        kind: EventKind::PaymentSucceeded,
        gateway_ref: Some(initiated.gateway_ref.clone()),
        transaction_id: Some(initiated.transaction_id),
    };

    let first = payments::reconcile(pool, &event).await.expect("reconcile");
    assert_eq!(first, ReconcileOutcome::Applied(TransactionStatus::Cleared));

    // redelivery: same end state, nothing else changes
    let second = payments::reconcile(pool, &event).await.expect("reconcile again");
    assert_eq!(second, ReconcileOutcome::AlreadySettled);

    // settlement changed the status and nothing else
    let row = sqlx::query(
        r#"SELECT status, gross_minor, fee_minor, payout_minor, payer_id, payee_id, kind
           FROM transactions
           WHERE id = $1"#,
    )
    .bind(initiated.transaction_id)
    .fetch_one(pool)
    .await
    .expect("select settled tx");
    assert_eq!(row.get::<String, _>("status"), "cleared");
    assert_eq!(row.get::<i64, _>("gross_minor"), 1000);
    assert_eq!(row.get::<i64, _>("fee_minor"), 125);
    assert_eq!(row.get::<i64, _>("payout_minor"), 875);
    assert_eq!(row.get::<i32, _>("payer_id"), fan);
    assert_eq!(row.get::<i32, _>("payee_id"), creator);
    assert_eq!(row.get::<String, _>("kind"), "tip");
}

#[actix_web::test]
async fn gateway_rejection_settles_transaction_by_ledger_id() {
    let Some(test_db) = support::try_init_test_db().await else {
        return;
    };
    let pool = &test_db.pool;
    let suffix = Uuid::new_v4().to_string();

    let fan = support::insert_user(pool, &format!("fan_{suffix}"), "fan", Some("cus_fan"), None).await;
    let creator = support::insert_user(
        pool,
        &format!("creator_{suffix}"),
        "creator",
        None,
        Some("acct_creator"),
    )
    .await;

    let gateway = MockGateway::new().failing_payment_intent();
    let caller = CallerContext {
        id: fan,
        role: Role::Fan,
    };

    let result = payments::initiate_tip(
        pool,
        &gateway,
        &BillingConfig::default(),
        &caller,
        creator,
        1000,
        None,
    )
    .await;
    assert!(matches!(result, Err(ServiceError::Gateway(_))));

    // The transaction never got a gateway reference, yet it is not left
    // pending: it was settled by its own id.
    let row = sqlx::query(
        "SELECT status, gateway_ref FROM transactions WHERE payer_id = $1",
    )
    .bind(fan)
    .fetch_one(pool)
    .await
    .expect("select tx");
    assert_eq!(row.get::<String, _>("status"), "failed");
    assert_eq!(row.get::<Option<String>, _>("gateway_ref"), None);
}

#[actix_web::test]
async fn webhook_endpoint_acknowledges_unknown_reference() {
    let Some(test_db) = support::try_init_test_db().await else {
        return;
    };

    let state = web::Data::new(support::build_state(
        test_db.pool.clone(),
        Arc::new(MockGateway::new()),
        "test-key",
    ));
    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let payload = json!({
        "type": "payment.succeeded",
        "data": { "id": "pi_nobody_knows" }
    });

    let req = test::TestRequest::post()
        .uri("/webhooks/payments")
        .insert_header(("X-Api-Key", "test-key"))
        .set_json(payload)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ignored"], json!(true));
}

#[actix_web::test]
async fn webhook_endpoint_rejects_bad_credentials() {
    let Some(test_db) = support::try_init_test_db().await else {
        return;
    };

    let state = web::Data::new(support::build_state(
        test_db.pool.clone(),
        Arc::new(MockGateway::new()),
        "test-key",
    ));
    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let req = test::TestRequest::post()
        .uri("/webhooks/payments")
        .insert_header(("X-Api-Key", "wrong-key"))
        .set_json(json!({ "type": "payment.succeeded" }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn webhook_endpoint_accepts_signed_delivery() {
    let Some(test_db) = support::try_init_test_db().await else {
        return;
    };

    let state = web::Data::new(support::build_state(
        test_db.pool.clone(),
        Arc::new(MockGateway::new()),
        "test-key",
    ));
    let app = test::init_service(App::new().app_data(state.clone()).service(payment_webhook)).await;

    let body = r#"{"type":"customer.updated","data":{"id":"cus_1"}}"#;
    let signature = podm::gateway::sign_hmac_sha256_hex("whsec_test", body.as_bytes());

    let req = test::TestRequest::post()
        .uri("/webhooks/payments")
        .insert_header(("X-Signature", signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["ignored"], json!(true));
}
