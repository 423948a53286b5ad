// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::common::serde_utils::double_option;
use crate::models::file::File;
use crate::models::roles::{parse_roles, RoleName, RoleSet};

// Representa um usuário (principal) vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    #[schema(example = "Maria Souza")]
    pub name: String,
    #[schema(example = "maria@escola.org")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub phone: String,

    #[schema(example = "school_admin:34")]
    pub roles: String,

    pub avatar_id: Option<i64>,

    // Preenchido apenas com expand=avatar
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<File>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role_set(&self) -> RoleSet {
        RoleSet::parse(&self.roles)
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

// Dados para inserir um usuário: a senha já chega com hash
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub roles: String,
    pub avatar_id: Option<i64>,
}

// ---
// Validação da string de papéis
// ---
pub fn validate_roles(roles: &str) -> Result<(), ValidationError> {
    let claims = parse_roles(roles);
    if claims.is_empty() {
        let mut err = ValidationError::new("roles");
        err.message = Some("Informe ao menos um papel.".into());
        return Err(err);
    }

    let scoped_without_id = claims.iter().any(|claim| {
        matches!(claim.role, RoleName::SchoolAdmin | RoleName::VendorAdmin)
            && !claim.entity_id.is_some_and(|id| id > 0)
    });
    if scoped_without_id {
        let mut err = ValidationError::new("roles");
        err.message = Some("Papéis com escopo exigem um ID de entidade positivo.".into());
        return Err(err);
    }

    Ok(())
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "admin@exemplo.com")]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    #[validate(length(min = 1, message = "O refresh token é obrigatório."))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonatePayload {
    pub user_id: i64,
}

// Resposta de autenticação
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ---
// CRUD de usuários
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[validate(custom(function = "validate_roles"))]
    #[schema(example = "vendor_admin:12")]
    pub roles: String,
    pub avatar_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    // Quando presente, é re-hasheada antes de salvar
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: Option<String>,
    pub phone: Option<String>,
    #[validate(custom(function = "validate_roles"))]
    pub roles: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub avatar_id: Option<Option<i64>>,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (ID do usuário)
    pub roles: String, // String de papéis completa, como está no banco
    pub iat: i64,
    pub exp: i64,
    // ID do admin que emitiu o token via impersonação
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imp: Option<i64>,
}

/// Principal autenticado da requisição atual, montado a partir de um token válido.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i64,
    pub roles: RoleSet,
    pub impersonator: Option<i64>,
}
