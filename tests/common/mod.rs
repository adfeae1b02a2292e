#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use avocado_shop_api::{
    completion::{ChatTurn, CompletionError, TextCompletion},
    config::{AppConfig, CompletionConfig, StripeConfig},
    db::{create_orm_conn, run_migrations},
    dto::{
        checkout::{CartLine, CheckoutRequest, CheckoutResponse},
        webhooks::WebhookAck,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Model as OrderModel},
        products::ActiveModel as ProductActive,
        sea_orm_active_enums::OrderStatus,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    payments::{
        CheckoutSession, CheckoutSessionRequest, HostedSession, PaymentError, PaymentGateway,
        SessionLineItem, signature,
    },
    response::ApiResponse,
    services::{checkout_service, order_store, webhook_service},
    state::AppState,
};
use chrono::{Datelike, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{Value, json};
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const JWT_SECRET: &str = "test-jwt-secret";
pub const HASS: &str = "hass-box-5kg";
pub const LAMB: &str = "lamb-hass-box-5kg";
pub const HASS_PRICE: i64 = 3500;
pub const LAMB_PRICE: i64 = 3600;

/// In-process payment provider. Sessions it opens can be read back and
/// turned into webhook payloads.
#[derive(Default)]
pub struct FakeGateway {
    counter: AtomicUsize,
    pub fail_create: AtomicBool,
    pub sessions: Mutex<HashMap<String, CheckoutSession>>,
    pub line_items: Mutex<HashMap<String, Vec<SessionLineItem>>>,
    pub requests: Mutex<Vec<CheckoutSessionRequest>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<HostedSession, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 500,
                message: "provider down".into(),
            });
        }

        let id = format!("cs_test_{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1);
        let items: Vec<SessionLineItem> = request
            .line_items
            .iter()
            .map(|item| SessionLineItem {
                description: Some(item.name.clone()),
                quantity: Some(i64::from(item.quantity)),
                amount_total: item.unit_amount * i64::from(item.quantity),
            })
            .collect();
        let session = CheckoutSession {
            id: id.clone(),
            client_reference_id: Some(request.order_id.clone()),
            payment_status: Some("unpaid".into()),
            amount_total: Some(items.iter().map(|item| item.amount_total).sum()),
            currency: Some(request.currency.clone()),
            metadata: request.metadata.clone().into_iter().collect(),
            ..Default::default()
        };
        self.sessions.lock().unwrap().insert(id.clone(), session);
        self.line_items.lock().unwrap().insert(id.clone(), items);

        Ok(HostedSession {
            url: format!("https://checkout.test/pay/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(PaymentError::Api {
                status: 404,
                message: "No such checkout session".into(),
            })
    }

    async fn list_line_items(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionLineItem>, PaymentError> {
        Ok(self
            .line_items
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeCompletion {
    pub prompts: Mutex<Vec<(String, usize, String)>>,
}

#[async_trait]
impl TextCompletion for FakeCompletion {
    async fn complete(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> Result<String, CompletionError> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), history.len(), message.to_string()));
        Ok("Our Hass boxes ship within two days.".to_string())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub completion: Arc<FakeCompletion>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        admin_email: Some("ops@farm.test".into()),
        admin_password_hash: None,
        stripe: StripeConfig {
            secret_key: "sk_test".into(),
            webhook_secret: WEBHOOK_SECRET.into(),
            api_base: "http://127.0.0.1:9".into(),
        },
        completion: CompletionConfig {
            api_url: "http://127.0.0.1:9/v1/chat/completions".into(),
            api_key: None,
            model: "test".into(),
        },
        public_base_url: "https://shop.test".into(),
        currency: "eur".into(),
        order_number_prefix: "AVO".into(),
    }
}

pub async fn setup_with(config: AppConfig) -> anyhow::Result<TestApp> {
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let gateway = Arc::new(FakeGateway::default());
    let completion = Arc::new(FakeCompletion::default());
    let state = AppState {
        orm,
        payments: gateway.clone(),
        completion: completion.clone(),
        config: Arc::new(config),
    };
    seed_products(&state).await?;

    Ok(TestApp {
        state,
        gateway,
        completion,
    })
}

pub async fn setup() -> anyhow::Result<TestApp> {
    setup_with(test_config()).await
}

/// Two year-round boxes plus one whose harvest window excludes the current month.
async fn seed_products(state: &AppState) -> anyhow::Result<()> {
    let next_month = Utc::now().month() as i32 % 12 + 1;
    let products = [
        (HASS, "Hass avocados 5 kg", HASS_PRICE, Some("hass"), None),
        (LAMB, "Lamb Hass avocados 5 kg", LAMB_PRICE, Some("lamb_hass"), None),
        (
            "hass-preorder-3kg",
            "Hass avocados 3 kg",
            2400,
            Some("hass"),
            Some(next_month),
        ),
    ];
    for (id, name, price, variety, month) in products {
        ProductActive {
            id: Set(id.into()),
            name: Set(name.into()),
            description: Set(None),
            price: Set(price),
            weight_grams: Set(5000),
            variety: Set(variety.map(str::to_string)),
            season_start_month: Set(month),
            season_end_month: Set(month),
            active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(&state.orm)
        .await?;
    }
    Ok(())
}

pub fn admin() -> AuthUser {
    AuthUser {
        subject: "ops@farm.test".into(),
        role: "admin".into(),
    }
}

pub fn line(product_id: &str, quantity: i32) -> CartLine {
    CartLine {
        product_id: product_id.into(),
        quantity,
        variety: None,
    }
}

pub fn cart(items: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        items,
        country: Some("es".into()),
        shipping_cost: 500,
        shipping_weight_grams: 5000,
        locale: Some("es".into()),
        success_url: None,
        cancel_url: None,
    }
}

pub async fn checkout(app: &TestApp, items: Vec<CartLine>) -> anyhow::Result<CheckoutResponse> {
    let resp = checkout_service::create_session(&app.state, cart(items)).await?;
    Ok(resp.data.expect("checkout data"))
}

pub async fn load_order(app: &TestApp, id: Uuid) -> anyhow::Result<OrderModel> {
    Ok(order_store::get_order(&app.state.orm, id).await?)
}

pub fn event(kind: &str, object: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": kind,
        "data": { "object": object },
    }))
    .unwrap()
}

/// Session object as the provider reports it once the customer paid.
pub fn paid_session(session_id: &str, order_id: Uuid, payment_status: &str) -> Value {
    json!({
        "id": session_id,
        "object": "checkout.session",
        "client_reference_id": order_id.to_string(),
        "payment_status": payment_status,
        "amount_total": HASS_PRICE + 500,
        "currency": "eur",
        "customer_details": {
            "email": "Ana@Example.com",
            "phone": "+34600111222",
            "name": "Ana Garcia",
            "address": {
                "line1": "Calle Mayor 1",
                "city": "Malaga",
                "postal_code": "29001",
                "country": "ES"
            }
        },
        "metadata": { "order_id": order_id.to_string() }
    })
}

pub async fn deliver(app: &TestApp, payload: &[u8]) -> AppResult<ApiResponse<WebhookAck>> {
    let header = signature::sign(payload, WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
    webhook_service::handle_webhook(&app.state, payload, Some(&header)).await
}

pub async fn insert_order(
    app: &TestApp,
    order_number: &str,
    status: OrderStatus,
) -> anyhow::Result<OrderModel> {
    let id = Uuid::now_v7();
    let now = Utc::now();
    Ok(OrderActive {
        id: Set(id),
        order_number: Set(order_number.into()),
        stripe_session_id: Set(format!("cs_seeded_{}", id.simple())),
        customer_email: Set(Some("ana@example.com".into())),
        customer_phone: Set(Some("+34600111222".into())),
        shipping_name: Set(Some("Ana Garcia".into())),
        shipping_line1: Set(Some("Calle Mayor 1".into())),
        shipping_line2: Set(None),
        shipping_city: Set(Some("Malaga".into())),
        shipping_state: Set(None),
        shipping_postal_code: Set(Some("29001".into())),
        shipping_country: Set(Some("ES".into())),
        destination_country: Set("es".into()),
        locale: Set("es".into()),
        shipping_cost: Set(500),
        total: Set(4000),
        currency: Set("eur".into()),
        status: Set(status),
        created_at: Set(now.into()),
        completed_at: Set(None),
        updated_at: Set(now.into()),
    }
    .insert(&app.state.orm)
    .await?)
}

pub fn password_hash(password: &str) -> String {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

/// Move an order's creation time into the past.
pub async fn backdate(app: &TestApp, order_id: Uuid, hours: i64) -> anyhow::Result<()> {
    use avocado_shop_api::entity::{Orders, orders::Column as OrderCol};
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    let mut changes: OrderActive = Default::default();
    changes.created_at = Set((Utc::now() - chrono::Duration::hours(hours)).into());
    Orders::update_many()
        .set(changes)
        .filter(OrderCol::Id.eq(order_id))
        .exec(&app.state.orm)
        .await?;
    Ok(())
}
