pub mod api;
pub mod db;
pub mod docs;
pub mod error;
pub mod fanout;
pub mod fees;
pub mod gateway;
pub mod models;
pub mod payments;
pub mod subscriptions;

use sqlx::PgPool;
use std::sync::Arc;

use crate::fees::BillingConfig;
use crate::gateway::PaymentGateway;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub gateway: Arc<dyn PaymentGateway>,
    pub billing: BillingConfig,
    /// Legacy shared-key webhook authentication.
    pub webhook_key: String,
    /// HMAC secret for signed webhook deliveries.
    pub webhook_secret: String,
}
