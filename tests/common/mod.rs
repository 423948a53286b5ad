// tests/common/mod.rs
//
// Monta o router completo sobre o MemoryStore: sem banco, mesmo pipeline de produção.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use school_deliveries::{
    config::{AppState, Config},
    db::{MemoryStore, Store},
    filter::DateBoundary,
    models::{
        auth::{NewUser, User},
        delivery::{NewDelivery, NewOrder, OrderStatus},
        school::NewSchool,
        vendor::{NewVendor, VendorCategory},
    },
    routes,
};

pub const PASSWORD: &str = "segredo1";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "segredo-de-teste".into(),
        base_url: "https://api.exemplo.org".into(),
        port: 0,
        max_page_size: 100,
        scheduled_to_boundary: DateBoundary::StartOfDay,
        db_max_connections: 1,
        admin: None,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(&test_config(), store.clone()).expect("estado de teste");
        Self { router: routes::app(state.clone()), store, state }
    }

    pub async fn user(&self, email: &str, roles: &str) -> User {
        self.store
            .insert_user(NewUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.into(),
                // Custo mínimo: os testes não precisam de hash lento
                password_hash: bcrypt::hash(PASSWORD, 4).unwrap(),
                phone: String::new(),
                roles: roles.into(),
                avatar_id: None,
            })
            .await
            .unwrap()
    }

    /// Usuário com os papéis dados e seu token de acesso.
    pub async fn login_as(&self, email: &str, roles: &str) -> (User, String) {
        let user = self.user(email, roles).await;
        let token = self.state.tokens.issue(&user).unwrap();
        (user, token)
    }

    pub async fn school(&self, name: &str) -> i64 {
        self.store
            .insert_school(NewSchool {
                name: name.into(),
                address: String::new(),
                latitude: -23.5,
                longitude: -46.6,
                contact_id: None,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn vendor(&self, name: &str) -> i64 {
        self.store
            .insert_vendor(NewVendor {
                name: name.into(),
                address: String::new(),
                latitude: -23.5,
                longitude: -46.6,
                category: VendorCategory::Produce,
                contact_id: None,
            })
            .await
            .unwrap()
            .id
    }

    pub async fn delivery(&self, school_id: i64, notes: &str) -> i64 {
        self.store
            .insert_delivery(NewDelivery {
                contract: "active".into(),
                package_type: "box".into(),
                scheduled_at: None,
                notes: notes.into(),
                school_id: Some(school_id),
            })
            .await
            .unwrap()
            .id
    }

    pub async fn order(&self, delivery_id: i64, vendor_id: i64, quantity: i32) -> i64 {
        self.store
            .insert_order(NewOrder {
                delivery_id: Some(delivery_id),
                item: "Arroz".into(),
                quantity,
                unit: "kg".into(),
                unit_cost: rust_decimal::Decimal::new(1050, 2),
                packed_at: None,
                purchased_at: None,
                vendor_id: Some(vendor_id),
                is_internal: false,
                status: OrderStatus::Pending,
                notes: String::new(),
            })
            .await
            .unwrap()
            .id
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }
}
