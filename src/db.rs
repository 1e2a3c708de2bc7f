// src/db.rs

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;

use crate::models::{
    Message, Role, Subscription, SubscriptionStatus, Tier, Transaction, TransactionKind,
    TransactionStatus,
};

fn decode_err(e: String) -> sqlx::Error {
    sqlx::Error::Decode(e.into())
}

#[derive(Debug)]
pub struct UserBilling {
    pub id: i32,
    pub role: Role,
    pub gateway_customer_id: Option<String>,
    pub gateway_account_id: Option<String>,
}

pub async fn get_user_billing(
    pool: &PgPool,
    user_id: i32,
) -> Result<Option<UserBilling>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, role, gateway_customer_id, gateway_account_id
           FROM users
           WHERE id = $1"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| {
        let role: String = r.get("role");
        Ok(UserBilling {
            id: r.get("id"),
            role: Role::from_str(&role).map_err(decode_err)?,
            gateway_customer_id: r.get("gateway_customer_id"),
            gateway_account_id: r.get("gateway_account_id"),
        })
    })
    .transpose()
}

fn tier_from_row(r: &PgRow) -> Tier {
    Tier {
        id: r.get("id"),
        creator_id: r.get("creator_id"),
        name: r.get("name"),
        description: r.get("description"),
        price_minor: r.get("price_minor"),
        currency: r.get("currency"),
        gateway_price_id: r.get("gateway_price_id"),
        is_active: r.get("is_active"),
        created_at: r.get("created_at"),
    }
}

pub async fn list_active_tiers(pool: &PgPool, creator_id: i32) -> Result<Vec<Tier>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, creator_id, name, description, price_minor, currency,
                  gateway_price_id, is_active, created_at
           FROM tiers
           WHERE creator_id = $1 AND is_active = true
           ORDER BY price_minor ASC"#,
    )
    .bind(creator_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(tier_from_row).collect())
}

pub async fn get_tier(pool: &PgPool, tier_id: i32) -> Result<Option<Tier>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, creator_id, name, description, price_minor, currency,
                  gateway_price_id, is_active, created_at
           FROM tiers
           WHERE id = $1"#,
    )
    .bind(tier_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(tier_from_row))
}

fn transaction_from_row(r: &PgRow) -> Result<Transaction, sqlx::Error> {
    let kind: String = r.get("kind");
    let status: String = r.get("status");

    Ok(Transaction {
        id: r.get("id"),
        payer_id: r.get("payer_id"),
        payee_id: r.get("payee_id"),
        kind: TransactionKind::from_str(&kind).map_err(decode_err)?,
        gross_minor: r.get("gross_minor"),
        fee_minor: r.get("fee_minor"),
        payout_minor: r.get("payout_minor"),
        status: TransactionStatus::from_str(&status).map_err(decode_err)?,
        content_id: r.get("content_id"),
        gateway_ref: r.get("gateway_ref"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

#[derive(Debug)]
pub struct NewTransaction {
    pub payer_id: i32,
    pub payee_id: i32,
    pub kind: TransactionKind,
    pub gross_minor: i64,
    pub fee_minor: i64,
    pub payout_minor: i64,
    pub content_id: Option<i32>,
}

/// Inserts a `pending` transaction with no gateway reference yet and returns
/// the ledger id.
pub async fn insert_pending_transaction(
    pool: &PgPool,
    tx: &NewTransaction,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO transactions
               (payer_id, payee_id, kind, gross_minor, fee_minor, payout_minor, status, content_id)
           VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
           RETURNING id"#,
    )
    .bind(tx.payer_id)
    .bind(tx.payee_id)
    .bind(tx.kind.as_str())
    .bind(tx.gross_minor)
    .bind(tx.fee_minor)
    .bind(tx.payout_minor)
    .bind(tx.content_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

pub async fn set_transaction_gateway_ref(
    pool: &PgPool,
    tx_id: i32,
    gateway_ref: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE transactions
           SET gateway_ref = $1, updated_at = NOW()
           WHERE id = $2"#,
    )
    .bind(gateway_ref)
    .bind(tx_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Moves a `pending` transaction to a terminal status. The `status =
/// 'pending'` guard makes redelivered webhook events a no-op; the returned
/// row count tells the caller whether anything changed.
pub async fn settle_transaction(
    pool: &PgPool,
    tx_id: i32,
    status: TransactionStatus,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE transactions
           SET status = $1, updated_at = NOW()
           WHERE id = $2 AND status = 'pending'"#,
    )
    .bind(status.as_str())
    .bind(tx_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn find_transaction(
    pool: &PgPool,
    tx_id: i32,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, payer_id, payee_id, kind, gross_minor, fee_minor, payout_minor,
                  status, content_id, gateway_ref, created_at, updated_at
           FROM transactions
           WHERE id = $1"#,
    )
    .bind(tx_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(transaction_from_row).transpose()
}

pub async fn find_transaction_by_gateway_ref(
    pool: &PgPool,
    gateway_ref: &str,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, payer_id, payee_id, kind, gross_minor, fee_minor, payout_minor,
                  status, content_id, gateway_ref, created_at, updated_at
           FROM transactions
           WHERE gateway_ref = $1"#,
    )
    .bind(gateway_ref)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(transaction_from_row).transpose()
}

fn subscription_from_row(r: &PgRow) -> Result<Subscription, sqlx::Error> {
    let status: String = r.get("status");

    Ok(Subscription {
        id: r.get("id"),
        payer_id: r.get("payer_id"),
        payee_id: r.get("payee_id"),
        tier_id: r.get("tier_id"),
        status: SubscriptionStatus::from_str(&status).map_err(decode_err)?,
        start_date: r.get("start_date"),
        end_date: r.get("end_date"),
        next_billing_date: r.get("next_billing_date"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

#[derive(Debug)]
pub struct NewSubscription {
    /// The gateway recurring-subscription id; becomes the ledger primary key.
    pub id: String,
    pub payer_id: i32,
    pub payee_id: i32,
    pub tier_id: i32,
    pub start_date: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
}

pub async fn insert_subscription(
    pool: &PgPool,
    sub: &NewSubscription,
) -> Result<Subscription, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO subscriptions
               (id, payer_id, payee_id, tier_id, status, start_date, next_billing_date)
           VALUES ($1, $2, $3, $4, 'active', $5, $6)
           RETURNING id, payer_id, payee_id, tier_id, status, start_date, end_date,
                     next_billing_date, created_at, updated_at"#,
    )
    .bind(&sub.id)
    .bind(sub.payer_id)
    .bind(sub.payee_id)
    .bind(sub.tier_id)
    .bind(sub.start_date)
    .bind(sub.next_billing_date)
    .fetch_one(pool)
    .await?;

    subscription_from_row(&row)
}

pub async fn find_subscription(
    pool: &PgPool,
    subscription_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT id, payer_id, payee_id, tier_id, status, start_date, end_date,
                  next_billing_date, created_at, updated_at
           FROM subscriptions
           WHERE id = $1"#,
    )
    .bind(subscription_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(subscription_from_row).transpose()
}

/// Marks a subscription canceled at the gateway-reported period end.
/// `start_date` and `tier_id` are untouched.
pub async fn mark_subscription_canceled(
    pool: &PgPool,
    subscription_id: &str,
    end_date: DateTime<Utc>,
) -> Result<Option<Subscription>, sqlx::Error> {
    let row = sqlx::query(
        r#"UPDATE subscriptions
           SET status = 'canceled', end_date = $1, updated_at = NOW()
           WHERE id = $2
           RETURNING id, payer_id, payee_id, tier_id, status, start_date, end_date,
                     next_billing_date, created_at, updated_at"#,
    )
    .bind(end_date)
    .bind(subscription_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(subscription_from_row).transpose()
}

pub async fn list_subscriptions_for_payer(
    pool: &PgPool,
    payer_id: i32,
) -> Result<Vec<Subscription>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, payer_id, payee_id, tier_id, status, start_date, end_date,
                  next_billing_date, created_at, updated_at
           FROM subscriptions
           WHERE payer_id = $1
           ORDER BY created_at DESC"#,
    )
    .bind(payer_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(subscription_from_row).collect()
}

/// Fans whose subscription still grants access right now.
/// `status = 'canceled'` still counts until the end of the paid period.
pub async fn list_active_subscriber_ids(
    pool: &PgPool,
    creator_id: i32,
) -> Result<Vec<i32>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT DISTINCT payer_id
           FROM subscriptions
           WHERE payee_id = $1
             AND status IN ('active', 'canceled')
             AND (end_date IS NULL OR end_date > NOW())"#,
    )
    .bind(creator_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|r| r.get("payer_id")).collect())
}

pub async fn list_messages_for_user(
    pool: &PgPool,
    user_id: i32,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT id, sender_id, recipient_id, body, created_at
           FROM messages
           WHERE recipient_id = $1
           ORDER BY created_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Message {
            id: r.get("id"),
            sender_id: r.get("sender_id"),
            recipient_id: r.get("recipient_id"),
            body: r.get("body"),
            created_at: r.get("created_at"),
        })
        .collect())
}

pub async fn insert_message(
    pool: &PgPool,
    sender_id: i32,
    recipient_id: i32,
    body: &str,
) -> Result<i32, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO messages (sender_id, recipient_id, body)
           VALUES ($1, $2, $3)
           RETURNING id"#,
    )
    .bind(sender_id)
    .bind(recipient_id)
    .bind(body)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}
