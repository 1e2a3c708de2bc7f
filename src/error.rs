// src/error.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

use crate::gateway::GatewayError;

/// Error vocabulary for the service layer.
///
/// Validation, authorization and not-found reject before any external call.
/// Gateway errors are returned only after the per-operation compensating
/// action has run, so callers never observe a half-finished orchestration.
#[derive(Debug)]
pub enum ServiceError {
    Validation(String),
    /// Covers both "not yours" and "does not exist" so the response cannot
    /// leak whether another user's resource exists.
    Authorization,
    NotFound(&'static str),
    Gateway(GatewayError),
    Ledger(sqlx::Error),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "{msg}"),
            ServiceError::Authorization => write!(f, "not allowed"),
            ServiceError::NotFound(what) => write!(f, "{what} not found"),
            ServiceError::Gateway(e) => write!(f, "payment gateway error: {e}"),
            ServiceError::Ledger(_) => write!(f, "storage error"),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(value: sqlx::Error) -> Self {
        Self::Ledger(value)
    }
}

impl From<GatewayError> for ServiceError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Authorization => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ServiceError::Ledger(e) = self {
            log::error!("ledger error: {e}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
