// src/db/store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
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

/// Armazenamento persistente usado pelos serviços.
///
/// Injetado via `AppState` como `Arc<dyn Store>`: Postgres em produção
/// ([`PgStore`](crate::db::PgStore)) e memória nos testes ([`MemoryStore`](crate::db::MemoryStore)).
/// As duas implementações aplicam os mesmos filtros (ver [`crate::filter`]).
#[async_trait]
pub trait Store: Send + Sync {
    // --- Usuários (apenas ativos; removidos via soft delete são invisíveis) ---
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn update_user(&self, user: &User) -> Result<User, AppError>;
    /// Marca `deleted_at`, limpa contatos de escolas/fornecedores e revoga refresh tokens.
    async fn soft_delete_user(&self, id: i64, at: DateTime<Utc>) -> Result<bool, AppError>;
    async fn query_users(&self, query: &UserQuery) -> Result<QueryResult<User>, AppError>;
    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError>;
    async fn find_file(&self, id: i64) -> Result<Option<File>, AppError>;

    // --- Escolas ---
    async fn find_school(&self, id: i64) -> Result<Option<School>, AppError>;
    async fn insert_school(&self, school: NewSchool) -> Result<School, AppError>;
    async fn update_school(&self, school: &School) -> Result<School, AppError>;
    async fn delete_school(&self, id: i64) -> Result<bool, AppError>;
    async fn query_schools(&self, query: &SchoolQuery) -> Result<QueryResult<School>, AppError>;
    async fn schools_by_ids(&self, ids: &[i64]) -> Result<Vec<School>, AppError>;

    // --- Fornecedores ---
    async fn find_vendor(&self, id: i64) -> Result<Option<Vendor>, AppError>;
    async fn insert_vendor(&self, vendor: NewVendor) -> Result<Vendor, AppError>;
    async fn update_vendor(&self, vendor: &Vendor) -> Result<Vendor, AppError>;
    async fn delete_vendor(&self, id: i64) -> Result<bool, AppError>;
    async fn query_vendors(&self, query: &VendorQuery) -> Result<QueryResult<Vendor>, AppError>;
    async fn vendors_by_ids(&self, ids: &[i64]) -> Result<Vec<Vendor>, AppError>;

    // --- Entregas ---
    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, AppError>;
    async fn insert_delivery(&self, delivery: NewDelivery) -> Result<Delivery, AppError>;
    /// Grava a entrega e as linhas de auditoria numa única transação.
    /// Falha com `Conflict` se `updated_at` mudou desde `changes.read_version`.
    async fn update_delivery(&self, delivery: &Delivery, changes: &ChangeSet) -> Result<Delivery, AppError>;
    /// Remove a entrega; os pedidos ficam com `delivery_id = NULL`.
    async fn delete_delivery(&self, id: i64) -> Result<bool, AppError>;
    async fn query_deliveries(&self, query: &DeliveryQuery) -> Result<QueryResult<Delivery>, AppError>;
    async fn delivery_logs(&self, delivery_id: i64) -> Result<Vec<ChangeLogEntry>, AppError>;

    // --- Pedidos ---
    async fn find_order(&self, id: i64) -> Result<Option<Order>, AppError>;
    async fn orders_for_deliveries(&self, delivery_ids: &[i64]) -> Result<Vec<Order>, AppError>;
    async fn insert_order(&self, order: NewOrder) -> Result<Order, AppError>;
    /// Mesma garantia de `update_delivery`.
    async fn update_order(&self, order: &Order, changes: &ChangeSet) -> Result<Order, AppError>;
    async fn delete_order(&self, id: i64) -> Result<bool, AppError>;
    async fn order_logs(&self, order_id: i64) -> Result<Vec<ChangeLogEntry>, AppError>;

    // --- Refresh tokens ---
    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError>;
    /// Consome o token (remove) e o devolve se ainda estiver válido em `now`.
    async fn take_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<RefreshToken>, AppError>;
    async fn delete_refresh_token(&self, token: &str) -> Result<bool, AppError>;
}
