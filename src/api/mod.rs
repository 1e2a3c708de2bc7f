pub mod auth;
pub mod messages;
pub mod subscriptions;
pub mod tiers;
pub mod tips;
pub mod webhooks;
