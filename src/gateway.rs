// src/gateway.rs
//
// Client for the payment gateway's REST API.
// Authorization: X-Api-Key header.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

const GATEWAY_API_BASE: &str = "https://api.gateway.example.com";

#[derive(Debug)]
pub enum GatewayError {
    Http(reqwest::Error),
    Api { status: u16, body: String },
    InvalidResponse(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Http(e) => write!(f, "http error: {e}"),
            GatewayError::Api { status, body } => {
                write!(f, "gateway api error status={status} body={body}")
            }
            GatewayError::InvalidResponse(e) => write!(f, "invalid response: {e}"),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    /// The payer's gateway customer reference.
    pub customer_id: String,
    /// The creator's connected payout account.
    pub payee_account_id: String,
    /// Routed to the platform; the rest settles on the payee account.
    pub application_fee_minor_units: i64,
    /// Correlation metadata: the ledger transaction id, echoed back in
    /// webhook events.
    pub metadata: IntentMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentMetadata {
    pub transaction_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySubscription {
    pub id: String,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    #[serde(default)]
    pub cancel_at: Option<DateTime<Utc>>,
}

/// Capabilities this service consumes from the payment gateway. The HTTP
/// client below is the production implementation; tests substitute a
/// recording mock.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        req: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError>;

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        method_id: &str,
    ) -> Result<(), GatewayError>;

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        method_id: &str,
    ) -> Result<(), GatewayError>;

    async fn create_recurring_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
    ) -> Result<GatewaySubscription, GatewayError>;

    async fn cancel_recurring_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<GatewaySubscription, GatewayError>;
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(base_url: Option<String>, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| GATEWAY_API_BASE.to_string()),
            api_key,
        }
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<T>(&body)
            .map_err(|e| GatewayError::InvalidResponse(format!("{e}; body={body}")))
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_payment_intent(
        &self,
        req: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/payment-intents", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(req)
            .send()
            .await?;

        Self::parse_response(resp).await
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        method_id: &str,
    ) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/payment-methods/attach", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(&serde_json::json!({
                "customerId": customer_id,
                "paymentMethodId": method_id,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        method_id: &str,
    ) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(format!(
                "{}/v1/customers/{customer_id}/default-payment-method",
                self.base_url
            ))
            .header("X-Api-Key", &self.api_key)
            .json(&serde_json::json!({ "paymentMethodId": method_id }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    async fn create_recurring_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/v1/subscriptions", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .json(&serde_json::json!({
                "customerId": customer_id,
                "priceId": price_id,
            }))
            .send()
            .await?;

        Self::parse_response(resp).await
    }

    async fn cancel_recurring_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<GatewaySubscription, GatewayError> {
        let resp = self
            .client
            .delete(format!(
                "{}/v1/subscriptions/{subscription_id}",
                self.base_url
            ))
            .header("X-Api-Key", &self.api_key)
            .query(&[("atPeriodEnd", if at_period_end { "true" } else { "false" })])
            .send()
            .await?;

        Self::parse_response(resp).await
    }
}

/// HMAC-SHA256 in hex over the raw webhook body.
pub fn sign_hmac_sha256_hex(secret: &str, data: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    hex::encode(result)
}

/// Verifies a webhook signature header against the raw body.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
