// src/db/order_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::change_log_repo::{insert_changes, list_changes, ChangeLogTable},
    models::{
        change_log::{ChangeLogEntry, ChangeSet},
        delivery::{NewOrder, Order},
    },
};

const ORDER_COLUMNS: &str = "id, delivery_id, item, quantity, unit, unit_cost, packed_at, purchased_at, \
                             vendor_id, is_internal, status, notes, created_at, updated_at";

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn find_by_deliveries(&self, delivery_ids: &[i64]) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE delivery_id = ANY($1) ORDER BY id"
        ))
        .bind(delivery_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn create<'e, E>(&self, executor: E, order: &NewOrder) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (delivery_id, item, quantity, unit, unit_cost, packed_at, purchased_at, \
                                 vendor_id, is_internal, status, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.delivery_id)
        .bind(&order.item)
        .bind(order.quantity)
        .bind(&order.unit)
        .bind(order.unit_cost)
        .bind(order.packed_at)
        .bind(order.purchased_at)
        .bind(order.vendor_id)
        .bind(order.is_internal)
        .bind(order.status.as_str())
        .bind(&order.notes)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    /// Mesmo protocolo de `DeliveryRepository::update_audited`.
    pub async fn update_audited(&self, order: &Order, changes: &ChangeSet) -> Result<Order, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders \
             SET delivery_id = $2, item = $3, quantity = $4, unit = $5, unit_cost = $6, \
                 packed_at = $7, purchased_at = $8, vendor_id = $9, is_internal = $10, \
                 status = $11, notes = $12, updated_at = $13 \
             WHERE id = $1 AND updated_at = $14 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id)
        .bind(order.delivery_id)
        .bind(&order.item)
        .bind(order.quantity)
        .bind(&order.unit)
        .bind(order.unit_cost)
        .bind(order.packed_at)
        .bind(order.purchased_at)
        .bind(order.vendor_id)
        .bind(order.is_internal)
        .bind(order.status.as_str())
        .bind(&order.notes)
        .bind(changes.changed_at)
        .bind(changes.read_version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                .bind(order.id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                AppError::Conflict("O pedido foi alterado por outra requisição.".into())
            } else {
                AppError::NotFound
            });
        };

        insert_changes(&mut *tx, ChangeLogTable::Order, order.id, changes).await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn logs(&self, order_id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        list_changes(&self.pool, ChangeLogTable::Order, order_id).await
    }
}
