// src/db/pg.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{
        delivery_repo::DeliveryRepository, order_repo::OrderRepository, school_repo::SchoolRepository,
        store::Store, token_repo::TokenRepository, user_repo::UserRepository, vendor_repo::VendorRepository,
    },
    filter::{
        deliveries::DeliveryQuery, schools::SchoolQuery, users::UserQuery, vendors::VendorQuery,
        QueryResult,
    },
    models::{
        auth::{NewUser, RefreshToken, User},
        change_log::{ChangeLogEntry, ChangeSet},
        delivery::{Delivery, NewDelivery, NewOrder, Order},
        file::File,
        school::{NewSchool, School},
        vendor::{NewVendor, Vendor},
    },
};

/// `Store` sobre o Postgres: só delega para os repositórios.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    users: UserRepository,
    schools: SchoolRepository,
    vendors: VendorRepository,
    deliveries: DeliveryRepository,
    orders: OrderRepository,
    tokens: TokenRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            schools: SchoolRepository::new(pool.clone()),
            vendors: VendorRepository::new(pool.clone()),
            deliveries: DeliveryRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            tokens: TokenRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    // --- Usuários ---

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users.find_by_email(email).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        self.users.create_user(&self.pool, &user).await
    }

    async fn update_user(&self, user: &User) -> Result<User, AppError> {
        self.users.update_user(&self.pool, user).await
    }

    async fn soft_delete_user(&self, id: i64, at: DateTime<Utc>) -> Result<bool, AppError> {
        self.users.soft_delete(id, at).await
    }

    async fn query_users(&self, query: &UserQuery) -> Result<QueryResult<User>, AppError> {
        self.users.query(query).await
    }

    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        self.users.find_by_ids(ids).await
    }

    async fn find_file(&self, id: i64) -> Result<Option<File>, AppError> {
        self.users.find_file(id).await
    }

    // --- Escolas ---

    async fn find_school(&self, id: i64) -> Result<Option<School>, AppError> {
        self.schools.find_by_id(id).await
    }

    async fn insert_school(&self, school: NewSchool) -> Result<School, AppError> {
        self.schools.create(&self.pool, &school).await
    }

    async fn update_school(&self, school: &School) -> Result<School, AppError> {
        self.schools.update(&self.pool, school).await
    }

    async fn delete_school(&self, id: i64) -> Result<bool, AppError> {
        self.schools.delete(id).await
    }

    async fn query_schools(&self, query: &SchoolQuery) -> Result<QueryResult<School>, AppError> {
        self.schools.query(query).await
    }

    async fn schools_by_ids(&self, ids: &[i64]) -> Result<Vec<School>, AppError> {
        self.schools.find_by_ids(ids).await
    }

    // --- Fornecedores ---

    async fn find_vendor(&self, id: i64) -> Result<Option<Vendor>, AppError> {
        self.vendors.find_by_id(id).await
    }

    async fn insert_vendor(&self, vendor: NewVendor) -> Result<Vendor, AppError> {
        self.vendors.create(&self.pool, &vendor).await
    }

    async fn update_vendor(&self, vendor: &Vendor) -> Result<Vendor, AppError> {
        self.vendors.update(&self.pool, vendor).await
    }

    async fn delete_vendor(&self, id: i64) -> Result<bool, AppError> {
        self.vendors.delete(id).await
    }

    async fn query_vendors(&self, query: &VendorQuery) -> Result<QueryResult<Vendor>, AppError> {
        self.vendors.query(query).await
    }

    async fn vendors_by_ids(&self, ids: &[i64]) -> Result<Vec<Vendor>, AppError> {
        self.vendors.find_by_ids(ids).await
    }

    // --- Entregas ---

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, AppError> {
        self.deliveries.find_by_id(id).await
    }

    async fn insert_delivery(&self, delivery: NewDelivery) -> Result<Delivery, AppError> {
        self.deliveries.create(&self.pool, &delivery).await
    }

    async fn update_delivery(&self, delivery: &Delivery, changes: &ChangeSet) -> Result<Delivery, AppError> {
        self.deliveries.update_audited(delivery, changes).await
    }

    async fn delete_delivery(&self, id: i64) -> Result<bool, AppError> {
        self.deliveries.delete(id).await
    }

    async fn query_deliveries(&self, query: &DeliveryQuery) -> Result<QueryResult<Delivery>, AppError> {
        self.deliveries.query(query).await
    }

    async fn delivery_logs(&self, delivery_id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        self.deliveries.logs(delivery_id).await
    }

    // --- Pedidos ---

    async fn find_order(&self, id: i64) -> Result<Option<Order>, AppError> {
        self.orders.find_by_id(id).await
    }

    async fn orders_for_deliveries(&self, delivery_ids: &[i64]) -> Result<Vec<Order>, AppError> {
        if delivery_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.orders.find_by_deliveries(delivery_ids).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, AppError> {
        self.orders.create(&self.pool, &order).await
    }

    async fn update_order(&self, order: &Order, changes: &ChangeSet) -> Result<Order, AppError> {
        self.orders.update_audited(order, changes).await
    }

    async fn delete_order(&self, id: i64) -> Result<bool, AppError> {
        self.orders.delete(id).await
    }

    async fn order_logs(&self, order_id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        self.orders.logs(order_id).await
    }

    // --- Refresh tokens ---

    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError> {
        self.tokens.create(user_id, token, expires_at).await
    }

    async fn take_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<RefreshToken>, AppError> {
        self.tokens.take(token, now).await
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<bool, AppError> {
        self.tokens.delete(token).await
    }
}
