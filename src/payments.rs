// src/payments.rs
//
// Transaction lifecycle: every payer-facing charge creates a `pending`
// ledger transaction first, then asks the gateway for a payment intent.
// Webhook events settle the transaction to `cleared` or `failed`; nothing
// ever moves a settled transaction back.

use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::db;
use crate::error::ServiceError;
use crate::fees::{compute_split, BillingConfig};
use crate::gateway::{IntentMetadata, PaymentGateway, PaymentIntentRequest};
use crate::models::{CallerContext, TransactionKind, TransactionStatus};

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentInitiated {
    pub transaction_id: i32,
    pub gateway_ref: String,
    /// Handed to the client to complete payer-side confirmation.
    pub client_secret: String,
}

/// Initiates a one-off tip to a creator.
///
/// Below-minimum amounts are rejected before any record is written or any
/// gateway call is made.
pub async fn initiate_tip(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    cfg: &BillingConfig,
    caller: &CallerContext,
    creator_id: i32,
    amount_minor: i64,
    note: Option<&str>,
) -> Result<PaymentInitiated, ServiceError> {
    if amount_minor < cfg.min_tip_minor {
        return Err(ServiceError::Validation(format!(
            "minimum tip is {} minor units",
            cfg.min_tip_minor
        )));
    }

    let initiated = initiate(
        pool,
        gateway,
        cfg,
        caller,
        creator_id,
        TransactionKind::Tip,
        amount_minor,
        None,
    )
    .await?;

    // The tip note rides along as a direct message; losing it does not void
    // the payment.
    if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
        if let Err(e) = db::insert_message(pool, caller.id, creator_id, note).await {
            log::warn!("tip note for tx {} not stored: {e}", initiated.transaction_id);
        }
    }

    Ok(initiated)
}

/// Initiates a pay-per-view unlock of a post or message.
pub async fn initiate_content_purchase(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    cfg: &BillingConfig,
    caller: &CallerContext,
    creator_id: i32,
    kind: TransactionKind,
    content_id: i32,
    amount_minor: i64,
) -> Result<PaymentInitiated, ServiceError> {
    if !matches!(kind, TransactionKind::PpvMessage | TransactionKind::PpvPost) {
        return Err(ServiceError::Validation(
            "purchase kind must be ppv_message or ppv_post".to_string(),
        ));
    }
    if amount_minor <= 0 {
        return Err(ServiceError::Validation(
            "amount must be positive".to_string(),
        ));
    }

    initiate(
        pool,
        gateway,
        cfg,
        caller,
        creator_id,
        kind,
        amount_minor,
        Some(content_id),
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn initiate(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    cfg: &BillingConfig,
    caller: &CallerContext,
    creator_id: i32,
    kind: TransactionKind,
    amount_minor: i64,
    content_id: Option<i32>,
) -> Result<PaymentInitiated, ServiceError> {
    if creator_id == caller.id {
        return Err(ServiceError::Validation(
            "cannot pay yourself".to_string(),
        ));
    }

    let payer = db::get_user_billing(pool, caller.id)
        .await?
        .ok_or(ServiceError::NotFound("user"))?;
    let customer_id = payer.gateway_customer_id.ok_or_else(|| {
        ServiceError::Validation("no payment profile on file".to_string())
    })?;

    let payee = db::get_user_billing(pool, creator_id)
        .await?
        .ok_or(ServiceError::NotFound("creator"))?;
    let payee_account_id = payee.gateway_account_id.ok_or_else(|| {
        ServiceError::Validation("creator cannot receive payments yet".to_string())
    })?;

    let (fee_minor, payout_minor) = compute_split(amount_minor, cfg.commission_percent);

    let tx_id = db::insert_pending_transaction(
        pool,
        &db::NewTransaction {
            payer_id: caller.id,
            payee_id: creator_id,
            kind,
            gross_minor: amount_minor,
            fee_minor,
            payout_minor,
            content_id,
        },
    )
    .await?;

    let intent = match gateway
        .create_payment_intent(&PaymentIntentRequest {
            amount_minor_units: amount_minor,
            currency: cfg.currency.clone(),
            customer_id,
            payee_account_id,
            application_fee_minor_units: fee_minor,
            metadata: IntentMetadata { transaction_id: tx_id },
        })
        .await
    {
        Ok(intent) => intent,
        Err(e) => {
            // The gateway never issued a reference, so the transaction is
            // settled by its own ledger id.
            if let Err(settle_err) =
                db::settle_transaction(pool, tx_id, TransactionStatus::Failed).await
            {
                log::error!("tx {tx_id} stuck pending after gateway rejection: {settle_err}");
            }
            return Err(ServiceError::Gateway(e));
        }
    };

    db::set_transaction_gateway_ref(pool, tx_id, &intent.id).await?;

    Ok(PaymentInitiated {
        transaction_id: tx_id,
        gateway_ref: intent.id,
        client_secret: intent.client_secret,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentSucceeded,
    PaymentFailed,
    Unrecognized,
}

/// A gateway event after webhook normalization: the event kind plus
/// whatever correlation handles the payload carried.
#[derive(Debug)]
pub struct PaymentEvent {
    pub kind: EventKind,
    pub gateway_ref: Option<String>,
    pub transaction_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(TransactionStatus),
    /// Redelivery of an event already applied; nothing changed.
    AlreadySettled,
    /// No transaction matches the event's references. Logged, acknowledged,
    /// never surfaced to a user.
    Unmatched,
    /// Event kind this service does not understand.
    Ignored,
}

/// Applies a gateway payment event to the ledger.
///
/// Resolution order: gateway reference first, then the correlation
/// transaction id from the intent metadata. Terminal transactions are left
/// untouched, so redelivered events are no-ops.
pub async fn reconcile(
    pool: &PgPool,
    event: &PaymentEvent,
) -> Result<ReconcileOutcome, ServiceError> {
    let target = match event.kind {
        EventKind::PaymentSucceeded => TransactionStatus::Cleared,
        EventKind::PaymentFailed => TransactionStatus::Failed,
        EventKind::Unrecognized => {
            log::info!("ignoring unrecognized payment event");
            return Ok(ReconcileOutcome::Ignored);
        }
    };

    let mut tx = None;
    if let Some(gateway_ref) = event.gateway_ref.as_deref() {
        tx = db::find_transaction_by_gateway_ref(pool, gateway_ref).await?;
    }
    if tx.is_none() {
        if let Some(tx_id) = event.transaction_id {
            tx = db::find_transaction(pool, tx_id).await?;
        }
    }

    let Some(tx) = tx else {
        log::warn!(
            "payment event references no known transaction gateway_ref={:?} transaction_id={:?}",
            event.gateway_ref,
            event.transaction_id
        );
        return Ok(ReconcileOutcome::Unmatched);
    };

    if tx.status.is_terminal() {
        return Ok(ReconcileOutcome::AlreadySettled);
    }

    let changed = db::settle_transaction(pool, tx.id, target).await?;
    if changed == 0 {
        // Lost the race with a concurrent delivery; same end state.
        return Ok(ReconcileOutcome::AlreadySettled);
    }

    Ok(ReconcileOutcome::Applied(target))
}
