// src/api/tips.rs

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::models::{CallerContext, Transaction, TransactionKind};
use crate::payments::{self, PaymentInitiated};
use crate::{db, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TipRequest {
    pub creator_id: i32,
    /// Gross amount in minor currency units.
    pub amount_minor: i64,
    /// Optional note, delivered to the creator as a direct message.
    pub message: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/tips",
    request_body = TipRequest,
    responses(
        (status = 200, description = "Tip initiated; confirm client-side with the secret", body = PaymentInitiated),
        (status = 400, description = "Below the tip minimum or payment profile missing"),
        (status = 502, description = "Payment gateway rejected the request")
    ),
    tag = "payments"
)]
#[post("/tips")]
pub async fn create_tip(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
    payload: web::Json<TipRequest>,
) -> Result<HttpResponse, ServiceError> {
    let initiated = payments::initiate_tip(
        &state.pool,
        state.gateway.as_ref(),
        &state.billing,
        &caller,
        payload.creator_id,
        payload.amount_minor,
        payload.message.as_deref(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(initiated))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    pub creator_id: i32,
    /// `ppv_post` or `ppv_message`.
    pub kind: TransactionKind,
    pub content_id: i32,
    pub amount_minor: i64,
}

#[utoipa::path(
    post,
    path = "/api/purchases",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Unlock initiated", body = PaymentInitiated),
        (status = 400, description = "Invalid kind or amount"),
        (status = 502, description = "Payment gateway rejected the request")
    ),
    tag = "payments"
)]
#[post("/purchases")]
pub async fn create_purchase(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
    payload: web::Json<PurchaseRequest>,
) -> Result<HttpResponse, ServiceError> {
    let initiated = payments::initiate_content_purchase(
        &state.pool,
        state.gateway.as_ref(),
        &state.billing,
        &caller,
        payload.creator_id,
        payload.kind,
        payload.content_id,
        payload.amount_minor,
    )
    .await?;

    Ok(HttpResponse::Ok().json(initiated))
}

#[utoipa::path(
    get,
    path = "/api/tips/{id}",
    params(("id" = i32, Path, description = "Ledger transaction id")),
    responses(
        (status = 200, description = "The caller's transaction", body = Transaction),
        (status = 403, description = "Not the caller's transaction")
    ),
    tag = "payments"
)]
#[get("/tips/{id}")]
pub async fn get_tip(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    // Missing and not-owned look identical to the caller.
    match db::find_transaction(&state.pool, path.into_inner()).await? {
        Some(tx) if tx.payer_id == caller.id => Ok(HttpResponse::Ok().json(tx)),
        _ => Err(ServiceError::Authorization),
    }
}
