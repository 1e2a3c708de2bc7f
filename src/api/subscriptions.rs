// src/api/subscriptions.rs

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::models::{CallerContext, Subscription};
use crate::{subscriptions, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub tier_id: i32,
    /// Gateway payment-method reference to attach and bill against.
    pub payment_method_ref: String,
}

#[utoipa::path(
    post,
    path = "/api/subscriptions",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscription active", body = Subscription),
        (status = 400, description = "Unknown tier or missing payment profile"),
        (status = 502, description = "Payment gateway rejected the request")
    ),
    tag = "subscriptions"
)]
#[post("/subscriptions")]
pub async fn create_subscription(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
    payload: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, ServiceError> {
    let sub = subscriptions::create(
        &state.pool,
        state.gateway.as_ref(),
        &caller,
        payload.tier_id,
        &payload.payment_method_ref,
    )
    .await?;

    Ok(HttpResponse::Ok().json(sub))
}

#[utoipa::path(
    post,
    path = "/api/subscriptions/{id}/cancel",
    params(("id" = String, Path, description = "Subscription id")),
    responses(
        (status = 200, description = "Canceled at period end", body = Subscription),
        (status = 403, description = "Unknown subscription or not the caller's")
    ),
    tag = "subscriptions"
)]
#[post("/subscriptions/{id}/cancel")]
pub async fn cancel_subscription(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let sub = subscriptions::cancel(
        &state.pool,
        state.gateway.as_ref(),
        &caller,
        &path.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(sub))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions",
    responses((status = 200, description = "The caller's subscriptions, newest first", body = [Subscription])),
    tag = "subscriptions"
)]
#[get("/subscriptions")]
pub async fn list_subscriptions(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
) -> Result<HttpResponse, ServiceError> {
    let subs = subscriptions::list_for_payer(&state.pool, &caller).await?;
    Ok(HttpResponse::Ok().json(subs))
}
