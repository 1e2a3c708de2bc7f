use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::tiers::list_creator_tiers,
        crate::api::tips::create_tip,
        crate::api::tips::create_purchase,
        crate::api::tips::get_tip,
        crate::api::subscriptions::create_subscription,
        crate::api::subscriptions::cancel_subscription,
        crate::api::subscriptions::list_subscriptions,
        crate::api::messages::broadcast_message,
        crate::api::webhooks::payment_webhook
    ),
    components(
        schemas(
            crate::api::auth::RegisterRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::AuthResponse,
            crate::api::tips::TipRequest,
            crate::api::tips::PurchaseRequest,
            crate::api::subscriptions::SubscribeRequest,
            crate::api::messages::SendMessageRequest,
            crate::api::messages::BroadcastRequest,
            crate::payments::PaymentInitiated,
            crate::models::Role,
            crate::models::Tier,
            crate::models::Transaction,
            crate::models::TransactionKind,
            crate::models::TransactionStatus,
            crate::models::Subscription,
            crate::models::SubscriptionStatus
        )
    ),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "tiers", description = "Creator tier catalogue"),
        (name = "payments", description = "Tips and pay-per-view unlocks"),
        (name = "subscriptions", description = "Recurring subscriptions"),
        (name = "messages", description = "Direct and broadcast messaging"),
        (name = "webhooks", description = "Callbacks from the payment gateway")
    )
)]
pub struct ApiDoc;
