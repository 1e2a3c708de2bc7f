// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Fan,
    Creator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Fan => "fan",
            Role::Creator => "creator",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fan" => Ok(Role::Fan),
            "creator" => Ok(Role::Creator),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Verified caller identity, inserted into request extensions by the JWT
/// middleware. Handlers take it as an explicit parameter instead of reading
/// shared request state.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub id: i32,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Tip,
    Subscription,
    PpvMessage,
    PpvPost,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Tip => "tip",
            TransactionKind::Subscription => "subscription",
            TransactionKind::PpvMessage => "ppv_message",
            TransactionKind::PpvPost => "ppv_post",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tip" => Ok(TransactionKind::Tip),
            "subscription" => Ok(TransactionKind::Subscription),
            "ppv_message" => Ok(TransactionKind::PpvMessage),
            "ppv_post" => Ok(TransactionKind::PpvPost),
            _ => Err(format!("invalid transaction kind: {s}")),
        }
    }
}

/// `refunded` is part of the vocabulary but nothing transitions into it yet;
/// a refund flow would have to define its own trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Cleared,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Cleared => "cleared",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }

    /// Terminal statuses are never overwritten; webhook redelivery relies on
    /// this.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "cleared" => Ok(TransactionStatus::Cleared),
            "failed" => Ok(TransactionStatus::Failed),
            "refunded" => Ok(TransactionStatus::Refunded),
            _ => Err(format!("invalid transaction status: {s}")),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `expired` exists for completeness; no code path sets it (a billing-cycle
/// sweep would, and none is implemented here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            "expired" => Ok(SubscriptionStatus::Expired),
            _ => Err(format!("invalid subscription status: {s}")),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Tier {
    pub id: i32,
    pub creator_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub currency: String,
    pub gateway_price_id: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// One financial event. All amounts are integer minor currency units;
/// `fee_minor + payout_minor == gross_minor` holds at creation and the
/// three are never recomputed afterwards. Only `status` and `updated_at`
/// change after insert.
#[derive(Debug, Serialize, ToSchema)]
pub struct Transaction {
    pub id: i32,
    pub payer_id: i32,
    pub payee_id: i32,
    pub kind: TransactionKind,
    pub gross_minor: i64,
    pub fee_minor: i64,
    pub payout_minor: i64,
    pub status: TransactionStatus,
    pub content_id: Option<i32>,
    pub gateway_ref: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A payer's recurring relationship to a creator tier. `id` is the gateway
/// recurring-subscription id.
#[derive(Debug, Serialize, ToSchema)]
pub struct Subscription {
    pub id: String,
    pub payer_id: i32,
    pub payee_id: i32,
    pub tier_id: i32,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub next_billing_date: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}
