// src/models/file.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

// Metadados de um arquivo enviado. O `path` é interno; o cliente só vê a URL.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub id: i64,

    #[serde(skip_serializing)]
    pub path: String,

    // Calculada na leitura por `with_url`, nunca persistida
    #[sqlx(skip)]
    #[schema(example = "https://cdn.exemplo.com/api/uploads/avatars/1.png")]
    pub url: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl File {
    pub fn public_url(base_url: &str, path: &str) -> String {
        format!("{}/api/uploads/{}", base_url.trim_end_matches('/'), path)
    }

    /// Etapa explícita de apresentação: deriva a URL pública a partir do `path`.
    pub fn with_url(mut self, base_url: &str) -> Self {
        self.url = Some(Self::public_url(base_url, &self.path));
        self
    }
}
