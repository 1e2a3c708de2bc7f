// src/main.rs
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use podm::fees::{BillingConfig, DEFAULT_COMMISSION_PERCENT, DEFAULT_MIN_TIP_MINOR};
use podm::gateway::HttpGateway;
use podm::{api, docs, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let gateway_api_key = env::var("GATEWAY_API_KEY").expect("GATEWAY_API_KEY required");
    let gateway_base_url = env::var("GATEWAY_API_BASE_URL").ok();
    let webhook_key = env::var("GATEWAY_WEBHOOK_KEY").expect("GATEWAY_WEBHOOK_KEY required");
    let webhook_secret = env::var("GATEWAY_WEBHOOK_SECRET").unwrap_or_default();

    let billing = BillingConfig {
        commission_percent: env::var("COMMISSION_RATE_PERCENT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_COMMISSION_PERCENT),
        min_tip_minor: env::var("MIN_TIP_MINOR")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_MIN_TIP_MINOR),
        currency: env::var("PLATFORM_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
    };

    let state = web::Data::new(AppState {
        pool,
        gateway: Arc::new(HttpGateway::new(gateway_base_url, gateway_api_key)),
        billing,
        webhook_key,
        webhook_secret,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Public auth routes
            .service(api::auth::register)
            .service(api::auth::login)
            // Authenticated routes
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::tiers::list_creator_tiers)
                    .service(api::tips::create_tip)
                    .service(api::tips::create_purchase)
                    .service(api::tips::get_tip)
                    .service(api::subscriptions::create_subscription)
                    .service(api::subscriptions::cancel_subscription)
                    .service(api::subscriptions::list_subscriptions)
                    .service(api::messages::send_message)
                    .service(api::messages::list_messages)
                    .service(api::messages::broadcast_message),
            )
            // Webhooks (public)
            .service(api::webhooks::payment_webhook)
    })
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
