// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;

use crate::services::token::TokenError;

// Mensagem única para qualquer falha de autenticação: o motivo real nunca vai pro cliente
pub const AUTH_REQUIRED_MESSAGE: &str = "Autenticação necessária.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo inválido '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Autenticação necessária")]
    AuthenticationRequired,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Acesso negado")]
    Forbidden { allowed: Vec<String> },

    #[error("Recurso não encontrado")]
    NotFound,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de token: {0}")]
    Token(#[from] TokenError),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),
}

impl AppError {
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::InvalidField {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn forbidden<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AppError::Forbidden {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

// ---
// Corpo de erro devolvido ao cliente
// ---
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

/// Formato JSON de [`ApiError`], usado apenas na documentação OpenAPI.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Recurso não encontrado.")]
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: "Um ou mais campos são inválidos.".into(),
                    details: Some(json!(details)),
                }
            }
            AppError::InvalidField { field, message } => {
                let mut details = serde_json::Map::new();
                details.insert(field, json!([message]));
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: "Um ou mais campos são inválidos.".into(),
                    details: Some(Value::Object(details)),
                }
            }
            AppError::AuthenticationRequired => {
                ApiError::new(StatusCode::UNAUTHORIZED, AUTH_REQUIRED_MESSAGE)
            }
            AppError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.")
            }
            AppError::Forbidden { allowed } => ApiError {
                status: StatusCode::FORBIDDEN,
                error: "Você não tem permissão para realizar esta ação.".into(),
                details: Some(json!({ "allowedRoles": allowed })),
            },
            AppError::NotFound | AppError::DatabaseError(sqlx::Error::RowNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "Recurso não encontrado.")
            }
            AppError::EmailAlreadyExists => {
                ApiError::new(StatusCode::CONFLICT, "Este e-mail já está em uso.")
            }
            AppError::Conflict(message) => ApiError::new(StatusCode::CONFLICT, message),

            // Falhas de assinatura na emissão são internas; o resto é token inválido
            AppError::Token(TokenError::MissingKey | TokenError::Signing(_)) => {
                tracing::error!("Erro Interno do Servidor: {}", err);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
            AppError::Token(reason) => {
                tracing::debug!(%reason, "token rejeitado");
                ApiError::new(StatusCode::UNAUTHORIZED, AUTH_REQUIRED_MESSAGE)
            }

            // DatabaseError, InternalServerError, BcryptError viram 500 genérico.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
