// src/subscriptions.rs
//
// Subscription lifecycle: the gateway's recurring-billing object is
// authoritative, the ledger row mirrors it under the same id. Multi-step
// consistency comes from call ordering plus one compensating action; there
// is no cross-record transaction to lean on.

use sqlx::PgPool;

use crate::db;
use crate::error::ServiceError;
use crate::gateway::{GatewaySubscription, PaymentGateway};
use crate::models::{CallerContext, Subscription, SubscriptionStatus, Tier};

/// Subscribes the caller to a creator tier.
///
/// Payment method attachment and recurring billing are set up at the gateway
/// first; the ledger row is written last. A ledger failure after the gateway
/// subscription exists triggers an immediate compensating cancel (no
/// billing object may exist without a ledger row).
pub async fn create(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    caller: &CallerContext,
    tier_id: i32,
    payment_method_ref: &str,
) -> Result<Subscription, ServiceError> {
    let tier = db::get_tier(pool, tier_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| ServiceError::Validation("unknown or inactive tier".to_string()))?;

    if tier.creator_id == caller.id {
        return Err(ServiceError::Validation(
            "cannot subscribe to your own tier".to_string(),
        ));
    }

    let payer = db::get_user_billing(pool, caller.id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    let customer_id = payer.gateway_customer_id.ok_or_else(|| {
        ServiceError::Validation("no payment profile on file".to_string())
    })?;

    gateway
        .attach_payment_method(&customer_id, payment_method_ref)
        .await?;
    gateway
        .set_default_payment_method(&customer_id, payment_method_ref)
        .await?;

    let gw_sub = gateway
        .create_recurring_subscription(&customer_id, &tier.gateway_price_id)
        .await?;

    record_gateway_subscription(pool, gateway, caller.id, &tier, gw_sub).await
}

/// Writes the ledger row for a gateway subscription that already exists,
/// cancelling it at the gateway if the write fails.
pub async fn record_gateway_subscription(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    payer_id: i32,
    tier: &Tier,
    gw_sub: GatewaySubscription,
) -> Result<Subscription, ServiceError> {
    let inserted = db::insert_subscription(
        pool,
        &db::NewSubscription {
            id: gw_sub.id.clone(),
            payer_id,
            payee_id: tier.creator_id,
            tier_id: tier.id,
            start_date: gw_sub.current_period_start,
            next_billing_date: gw_sub.current_period_end,
        },
    )
    .await;

    match inserted {
        Ok(sub) => Ok(sub),
        Err(e) => {
            // Immediate cancel, not at period end: no period was delivered.
            if let Err(cancel_err) = gateway
                .cancel_recurring_subscription(&gw_sub.id, false)
                .await
            {
                log::error!(
                    "orphaned gateway subscription {}: ledger insert failed ({e}), \
                     compensating cancel failed ({cancel_err})",
                    gw_sub.id
                );
            }
            Err(ServiceError::Ledger(e))
        }
    }
}

/// Cancels the caller's subscription at period end.
///
/// Not-found and not-owned produce the same authorization error so the
/// response does not reveal whether another user's subscription exists.
/// Access runs through the already-paid period: `end_date` is the gateway's
/// cancellation-effective timestamp, never "now".
pub async fn cancel(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    caller: &CallerContext,
    subscription_id: &str,
) -> Result<Subscription, ServiceError> {
    let sub = match db::find_subscription(pool, subscription_id).await? {
        Some(sub) if sub.payer_id == caller.id => sub,
        _ => return Err(ServiceError::Authorization),
    };

    if sub.status == SubscriptionStatus::Canceled {
        return Ok(sub);
    }

    let gw_sub = gateway
        .cancel_recurring_subscription(&sub.id, true)
        .await?;
    let end_date = gw_sub.cancel_at.unwrap_or(gw_sub.current_period_end);

    // Gateway first, ledger second: if this write fails the gateway is
    // already canceled and the local row goes stale until reconciled.
    db::mark_subscription_canceled(pool, &sub.id, end_date)
        .await?
        .ok_or(ServiceError::NotFound("subscription"))
}

pub async fn list_for_payer(
    pool: &PgPool,
    caller: &CallerContext,
) -> Result<Vec<Subscription>, ServiceError> {
    Ok(db::list_subscriptions_for_payer(pool, caller.id).await?)
}
