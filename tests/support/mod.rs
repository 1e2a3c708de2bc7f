#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use std::env;
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{Mutex as DbLock, MutexGuard};

use podm::fees::BillingConfig;
use podm::gateway::{
    GatewayError, GatewaySubscription, PaymentGateway, PaymentIntent, PaymentIntentRequest,
};
use podm::AppState;

fn split_db_url(url: &str) -> Result<(String, String), String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query)),
        None => (url.to_string(), None),
    };

    let db_start = base
        .rfind('/')
        .ok_or_else(|| "invalid database url".to_string())?;
    if db_start + 1 >= base.len() {
        return Err("database name is empty".to_string());
    }

    let db_name = base[db_start + 1..].to_string();
    let mut admin_url = format!("{}postgres", &base[..db_start + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }

    Ok((admin_url, db_name))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

static TEST_DB_LOCK: OnceLock<DbLock<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

/// Provisions a fresh test database from `TEST_DATABASE_URL`, or `None`
/// (with a note) when the variable is unset so the suite skips instead of
/// failing on machines without Postgres.
pub async fn try_init_test_db() -> Option<TestDb> {
    dotenvy::dotenv().ok();
    let test_url = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping database-backed test");
            return None;
        }
    };
    let (admin_url, db_name) = split_db_url(&test_url).expect("invalid TEST_DATABASE_URL format");

    let lock = TEST_DB_LOCK.get_or_init(|| DbLock::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url).await.expect("connect admin db");

    let _ = sqlx::query("SELECT pg_advisory_lock(424242)")
        .execute(&admin_pool)
        .await;

    let quoted_name = quote_identifier(&db_name);
    let drop_sql = format!("DROP DATABASE IF EXISTS {quoted_name} WITH (FORCE)");
    let create_sql = format!("CREATE DATABASE {quoted_name}");

    let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
    let create_result = sqlx::query(&create_sql).execute(&admin_pool).await;
    if let Err(e) = create_result {
        eprintln!("create test db error: {e}");
        let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
        sqlx::query(&create_sql)
            .execute(&admin_pool)
            .await
            .expect("create test db retry");
    }

    let _ = sqlx::query("SELECT pg_advisory_unlock(424242)")
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;

    let pool = PgPool::connect(&test_url).await.expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    Some(TestDb {
        pool,
        _guard: guard,
    })
}

pub fn build_state(pool: PgPool, gateway: Arc<MockGateway>, webhook_key: &str) -> AppState {
    AppState {
        pool,
        gateway,
        billing: BillingConfig::default(),
        webhook_key: webhook_key.to_string(),
        webhook_secret: "whsec_test".to_string(),
    }
}

pub async fn insert_user(
    pool: &PgPool,
    suffix: &str,
    role: &str,
    gateway_customer_id: Option<&str>,
    gateway_account_id: Option<&str>,
) -> i32 {
    sqlx::query(
        r#"INSERT INTO users
               (username, email, password_hash, role, gateway_customer_id, gateway_account_id)
           VALUES ($1, $2, 'test-hash', $3, $4, $5)
           RETURNING id"#,
    )
    .bind(format!("user_{suffix}"))
    .bind(format!("{suffix}@podm.test"))
    .bind(role)
    .bind(gateway_customer_id)
    .bind(gateway_account_id)
    .fetch_one(pool)
    .await
    .expect("insert user")
    .get("id")
}

pub async fn insert_tier(
    pool: &PgPool,
    creator_id: i32,
    price_minor: i64,
    gateway_price_id: &str,
) -> i32 {
    sqlx::query(
        r#"INSERT INTO tiers (creator_id, name, description, price_minor, currency, gateway_price_id)
           VALUES ($1, 'Gold', 'Test tier', $2, 'USD', $3)
           RETURNING id"#,
    )
    .bind(creator_id)
    .bind(price_minor)
    .bind(gateway_price_id)
    .fetch_one(pool)
    .await
    .expect("insert tier")
    .get("id")
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    CreateIntent {
        amount_minor: i64,
        fee_minor: i64,
        transaction_id: i32,
    },
    AttachMethod {
        customer: String,
        method: String,
    },
    SetDefaultMethod {
        customer: String,
        method: String,
    },
    CreateSubscription {
        customer: String,
        price_id: String,
    },
    CancelSubscription {
        id: String,
        at_period_end: bool,
    },
}

/// Records every call and answers with canned objects. Timestamps are
/// second-aligned so values survive a Postgres round trip unchanged.
pub struct MockGateway {
    calls: Mutex<Vec<GatewayCall>>,
    pub subscription_id: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub fail_payment_intent: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        let now = DateTime::from_timestamp(Utc::now().timestamp(), 0).expect("valid timestamp");
        Self {
            calls: Mutex::new(Vec::new()),
            subscription_id: "gwsub_test".to_string(),
            period_start: now,
            period_end: now + Duration::days(30),
            fail_payment_intent: false,
        }
    }

    pub fn with_subscription_id(mut self, id: &str) -> Self {
        self.subscription_id = id.to_string();
        self
    }

    pub fn failing_payment_intent(mut self) -> Self {
        self.fail_payment_intent = true;
        self
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn make_subscription(&self) -> GatewaySubscription {
        GatewaySubscription {
            id: self.subscription_id.clone(),
            status: "active".to_string(),
            current_period_start: self.period_start,
            current_period_end: self.period_end,
            cancel_at: None,
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(
        &self,
        req: &PaymentIntentRequest,
    ) -> Result<PaymentIntent, GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::CreateIntent {
            amount_minor: req.amount_minor_units,
            fee_minor: req.application_fee_minor_units,
            transaction_id: req.metadata.transaction_id,
        });

        if self.fail_payment_intent {
            return Err(GatewayError::Api {
                status: 402,
                body: "card declined".to_string(),
            });
        }

        Ok(PaymentIntent {
            id: format!("pi_{}", req.metadata.transaction_id),
            client_secret: "cs_test".to_string(),
        })
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        method_id: &str,
    ) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(GatewayCall::AttachMethod {
            customer: customer_id.to_string(),
            method: method_id.to_string(),
        });
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        method_id: &str,
    ) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::SetDefaultMethod {
                customer: customer_id.to_string(),
                method: method_id.to_string(),
            });
        Ok(())
    }

    async fn create_recurring_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
    ) -> Result<GatewaySubscription, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::CreateSubscription {
                customer: customer_id.to_string(),
                price_id: price_id.to_string(),
            });
        Ok(self.make_subscription())
    }

    async fn cancel_recurring_subscription(
        &self,
        subscription_id: &str,
        at_period_end: bool,
    ) -> Result<GatewaySubscription, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(GatewayCall::CancelSubscription {
                id: subscription_id.to_string(),
                at_period_end,
            });

        Ok(GatewaySubscription {
            id: subscription_id.to_string(),
            status: if at_period_end { "active" } else { "canceled" }.to_string(),
            current_period_start: self.period_start,
            current_period_end: self.period_end,
            cancel_at: Some(self.period_end),
        })
    }
}
