// src/models/change_log.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Uma linha da trilha de auditoria (entrega ou pedido). Imutável depois de gravada.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub id: i64,
    pub entity_id: i64,
    pub changed_by: i64,
    // Nome de quem alterou, vindo do JOIN com users
    pub changed_by_name: Option<String>,
    pub changed_at: DateTime<Utc>,
    #[schema(example = "quantity")]
    pub field_name: String,
    #[schema(example = "5")]
    pub old_value: String,
    #[schema(example = "7")]
    pub new_value: String,
}

/// Diferença de um único campo rastreado, já renderizada como texto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field_name: &'static str,
    pub old_value: String,
    pub new_value: String,
}

/// Tudo que o store precisa para gravar uma atualização auditada numa única transação.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    pub changed_by: i64,
    pub changed_at: DateTime<Utc>,
    // `updated_at` lido antes do diff; o UPDATE só vale se ainda for o mesmo
    pub read_version: DateTime<Utc>,
    pub changes: Vec<FieldChange>,
}
