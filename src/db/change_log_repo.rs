// src/db/change_log_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    models::change_log::{ChangeLogEntry, ChangeSet},
};

/// As duas trilhas de auditoria têm o mesmo formato; muda a tabela e a coluna da entidade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeLogTable {
    Delivery,
    Order,
}

impl ChangeLogTable {
    fn table(&self) -> &'static str {
        match self {
            ChangeLogTable::Delivery => "delivery_change_log",
            ChangeLogTable::Order => "order_change_log",
        }
    }

    fn entity_column(&self) -> &'static str {
        match self {
            ChangeLogTable::Delivery => "delivery_id",
            ChangeLogTable::Order => "order_id",
        }
    }
}

/// Grava uma linha por campo alterado num único INSERT (UNNEST dos arrays).
pub async fn insert_changes<'e, E>(
    executor: E,
    table: ChangeLogTable,
    entity_id: i64,
    changes: &ChangeSet,
) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    if changes.changes.is_empty() {
        return Ok(0);
    }

    let fields: Vec<&str> = changes.changes.iter().map(|c| c.field_name).collect();
    let old_values: Vec<&str> = changes.changes.iter().map(|c| c.old_value.as_str()).collect();
    let new_values: Vec<&str> = changes.changes.iter().map(|c| c.new_value.as_str()).collect();

    let sql = format!(
        "INSERT INTO {table} ({column}, changed_by, changed_at, field_name, old_value, new_value) \
         SELECT $1, $2, $3, f, o, n FROM UNNEST($4::text[], $5::text[], $6::text[]) AS t(f, o, n)",
        table = table.table(),
        column = table.entity_column(),
    );

    let result = sqlx::query(&sql)
        .bind(entity_id)
        .bind(changes.changed_by)
        .bind(changes.changed_at)
        .bind(fields)
        .bind(old_values)
        .bind(new_values)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

// Mais recentes primeiro, com o nome de quem alterou
pub async fn list_changes<'e, E>(
    executor: E,
    table: ChangeLogTable,
    entity_id: i64,
) -> Result<Vec<ChangeLogEntry>, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT l.id, l.{column} AS entity_id, l.changed_by, u.name AS changed_by_name, \
                l.changed_at, l.field_name, l.old_value, l.new_value \
         FROM {table} l \
         LEFT JOIN users u ON u.id = l.changed_by \
         WHERE l.{column} = $1 \
         ORDER BY l.changed_at DESC, l.id DESC",
        table = table.table(),
        column = table.entity_column(),
    );

    let entries = sqlx::query_as::<_, ChangeLogEntry>(&sql)
        .bind(entity_id)
        .fetch_all(executor)
        .await?;
    Ok(entries)
}
