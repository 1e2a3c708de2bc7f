// src/api/messages.rs

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::error::ServiceError;
use crate::models::{CallerContext, Role};
use crate::{db, fanout, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub recipient_id: i32,
    pub body: String,
}

#[post("/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ServiceError> {
    let body = payload.body.trim();
    if body.is_empty() {
        return Err(ServiceError::Validation("message body is empty".to_string()));
    }

    let message_id = db::insert_message(&state.pool, caller.id, payload.recipient_id, body).await?;

    Ok(HttpResponse::Ok().json(json!({ "message_id": message_id })))
}

#[get("/messages")]
pub async fn list_messages(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
) -> Result<HttpResponse, ServiceError> {
    let messages = db::list_messages_for_user(&state.pool, caller.id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    pub body: String,
}

/// Sends one copy of the body to every fan with a currently paid-up
/// subscription. Sequential and best-effort: an individual failure is
/// logged and skipped, the rest still go out.
#[utoipa::path(
    post,
    path = "/api/messages/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Per-recipient delivery tally"),
        (status = 403, description = "Caller is not a creator")
    ),
    tag = "messages"
)]
#[post("/messages/broadcast")]
pub async fn broadcast_message(
    state: web::Data<AppState>,
    caller: web::ReqData<CallerContext>,
    payload: web::Json<BroadcastRequest>,
) -> Result<HttpResponse, ServiceError> {
    if !matches!(caller.role, Role::Creator | Role::Admin) {
        return Err(ServiceError::Authorization);
    }

    let body = payload.body.trim();
    if body.is_empty() {
        return Err(ServiceError::Validation("message body is empty".to_string()));
    }

    let recipients = db::list_active_subscriber_ids(&state.pool, caller.id).await?;

    let results = fanout::deliver_each(&recipients, |recipient_id| {
        db::insert_message(&state.pool, caller.id, recipient_id, body)
    })
    .await;
    let (delivered, failed) = fanout::tally(&results);

    Ok(HttpResponse::Ok().json(json!({
        "recipients": recipients.len(),
        "delivered": delivered,
        "failed": failed,
    })))
}
