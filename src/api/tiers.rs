// src/api/tiers.rs

use actix_web::{get, web, HttpResponse};

use crate::error::ServiceError;
use crate::models::Tier;
use crate::{db, AppState};

#[utoipa::path(
    get,
    path = "/api/creators/{id}/tiers",
    params(("id" = i32, Path, description = "Creator user id")),
    responses((status = 200, description = "Active tiers, cheapest first", body = [Tier])),
    tag = "tiers"
)]
#[get("/creators/{id}/tiers")]
pub async fn list_creator_tiers(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let tiers = db::list_active_tiers(&state.pool, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tiers))
}
