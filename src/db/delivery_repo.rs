// src/db/delivery_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::{
        change_log_repo::{insert_changes, list_changes, ChangeLogTable},
        query::fetch_page,
    },
    filter::{deliveries::DeliveryQuery, QueryResult},
    models::{
        change_log::{ChangeLogEntry, ChangeSet},
        delivery::{Delivery, NewDelivery},
    },
};

const DELIVERY_COLUMNS: &str = "d.id, d.contract, d.package_type, d.scheduled_at, d.notes, \
                                d.school_id, d.created_at, d.updated_at";

const RETURNING: &str =
    "RETURNING id, contract, package_type, scheduled_at, notes, school_id, created_at, updated_at";

// A busca textual olha o nome da escola, daí o JOIN
const DELIVERY_FROM: &str = "deliveries d LEFT JOIN schools sc ON sc.id = d.school_id";

#[derive(Clone)]
pub struct DeliveryRepository {
    pool: PgPool,
}

impl DeliveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Delivery>, AppError> {
        let delivery = sqlx::query_as::<_, Delivery>(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d WHERE d.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(delivery)
    }

    pub async fn query(&self, query: &DeliveryQuery) -> Result<QueryResult<Delivery>, AppError> {
        fetch_page(&self.pool, DELIVERY_COLUMNS, DELIVERY_FROM, query).await
    }

    pub async fn create<'e, E>(&self, executor: E, delivery: &NewDelivery) -> Result<Delivery, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let delivery = sqlx::query_as::<_, Delivery>(&format!(
            "INSERT INTO deliveries (contract, package_type, scheduled_at, notes, school_id) \
             VALUES ($1, $2, $3, $4, $5) {RETURNING}"
        ))
        .bind(&delivery.contract)
        .bind(&delivery.package_type)
        .bind(delivery.scheduled_at)
        .bind(&delivery.notes)
        .bind(delivery.school_id)
        .fetch_one(executor)
        .await?;
        Ok(delivery)
    }

    /// Atualização auditada: UPDATE condicional à versão lida + linhas de log, tudo ou nada.
    pub async fn update_audited(&self, delivery: &Delivery, changes: &ChangeSet) -> Result<Delivery, AppError> {
        // 1. Abre a transação
        let mut tx = self.pool.begin().await?;

        // 2. UPDATE só se ninguém alterou desde a leitura
        let updated = sqlx::query_as::<_, Delivery>(&format!(
            "UPDATE deliveries \
             SET contract = $2, package_type = $3, scheduled_at = $4, notes = $5, school_id = $6, \
                 updated_at = $7 \
             WHERE id = $1 AND updated_at = $8 {RETURNING}"
        ))
        .bind(delivery.id)
        .bind(&delivery.contract)
        .bind(&delivery.package_type)
        .bind(delivery.scheduled_at)
        .bind(&delivery.notes)
        .bind(delivery.school_id)
        .bind(changes.changed_at)
        .bind(changes.read_version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM deliveries WHERE id = $1)")
                .bind(delivery.id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                AppError::Conflict("A entrega foi alterada por outra requisição.".into())
            } else {
                AppError::NotFound
            });
        };

        // 3. Auditoria na mesma transação
        insert_changes(&mut *tx, ChangeLogTable::Delivery, delivery.id, changes).await?;

        // 4. Commit
        tx.commit().await?;
        Ok(updated)
    }

    // Pedidos sobrevivem: orders.delivery_id vira NULL (FK ON DELETE SET NULL)
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM deliveries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn logs(&self, delivery_id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        list_changes(&self.pool, ChangeLogTable::Delivery, delivery_id).await
    }
}
