// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::Store,
    middleware::rbac::require_any_role,
    models::{
        auth::{Identity, LoginResponse, NewUser, TokenResponse, User},
        roles::{RoleClaim, ADMIN},
    },
    services::token::TokenService,
};

// Validade do refresh token opaco
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

// ---
// Hash de senha: passo explícito, fora do store, em thread bloqueante
// ---
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, "login efetuado");
        self.issue_session(user).await
    }

    /// Troca um refresh token válido por um novo par; o antigo deixa de valer.
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, AppError> {
        let Some(stored) = self.store.take_refresh_token(refresh_token, Utc::now()).await? else {
            tracing::warn!(target: "audit", "refresh token desconhecido, expirado ou reutilizado");
            return Err(AppError::AuthenticationRequired);
        };

        let user = self
            .store
            .find_user(stored.user_id)
            .await?
            .ok_or(AppError::AuthenticationRequired)?;

        self.issue_session(user).await
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        // Token já removido não é erro: logout é idempotente
        self.store.delete_refresh_token(refresh_token).await?;
        Ok(())
    }

    pub async fn me(&self, identity: &Identity) -> Result<User, AppError> {
        self.store
            .find_user(identity.user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Emite um token com a identidade de outro usuário. Só admin; sempre auditado.
    pub async fn impersonate(&self, actor: &Identity, target_id: i64) -> Result<TokenResponse, AppError> {
        require_any_role(&actor.roles, &[ADMIN])?;

        let target = self
            .store
            .find_user(target_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let token = self.tokens.issue_impersonation(&target, actor.user_id)?;

        tracing::warn!(
            target: "audit",
            actor_id = actor.user_id,
            target_id = target.id,
            target_roles = %target.roles,
            "token de impersonação emitido"
        );

        Ok(TokenResponse { token })
    }

    /// Cria o admin inicial ou, se o e-mail já existe, renova senha e garante o papel.
    pub async fn seed_admin(&self, name: &str, email: &str, password: &str) -> Result<User, AppError> {
        let password_hash = hash_password(password).await?;

        if let Some(mut user) = self.store.find_user_by_email(email).await? {
            user.password_hash = password_hash;
            if !user.role_set().holds(&RoleClaim::admin()) {
                user.roles = format!("{},{}", ADMIN, user.roles);
            }
            let user = self.store.update_user(&user).await?;
            tracing::info!(user_id = user.id, "admin inicial atualizado");
            return Ok(user);
        }

        let user = self
            .store
            .insert_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
                phone: String::new(),
                roles: ADMIN.to_string(),
                avatar_id: None,
            })
            .await?;
        tracing::info!(user_id = user.id, "admin inicial criado");
        Ok(user)
    }

    async fn issue_session(&self, user: User) -> Result<LoginResponse, AppError> {
        let token = self.tokens.issue(&user)?;
        let refresh_token = Uuid::new_v4().to_string();
        self.store
            .insert_refresh_token(user.id, &refresh_token, Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS))
            .await?;

        Ok(LoginResponse { token, refresh_token, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::roles::RoleSet;

    async fn service_with_user(roles: &str) -> (AuthService, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(NewUser {
                name: "Ana".into(),
                email: "ana@escola.org".into(),
                password_hash: bcrypt::hash("segredo1", 4).unwrap(),
                phone: String::new(),
                roles: roles.into(),
                avatar_id: None,
            })
            .await
            .unwrap();
        let tokens = TokenService::new("chave-de-teste").unwrap();
        (AuthService::new(store.clone(), tokens), store, user)
    }

    #[tokio::test]
    async fn login_issues_tokens_and_refresh_rotates() {
        let (auth, _store, user) = service_with_user("school_admin:3").await;

        let session = auth.login("ANA@escola.org", "segredo1").await.unwrap();
        assert_eq!(session.user.id, user.id);

        let rotated = auth.refresh(&session.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, session.refresh_token);

        // O token antigo já foi consumido
        let reused = auth.refresh(&session.refresh_token).await;
        assert!(matches!(reused, Err(AppError::AuthenticationRequired)));
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (auth, _store, _) = service_with_user("admin").await;
        let result = auth.login("ana@escola.org", "errada").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn impersonation_requires_admin_and_marks_token() {
        let (auth, _store, target) = service_with_user("vendor_admin:12").await;
        let tokens = TokenService::new("chave-de-teste").unwrap();

        let admin = Identity { user_id: 99, roles: RoleSet::parse("admin"), impersonator: None };
        let issued = auth.impersonate(&admin, target.id).await.unwrap();
        let identity = tokens.validate(&issued.token).unwrap();
        assert_eq!(identity.user_id, target.id);
        assert_eq!(identity.impersonator, Some(99));

        let school = Identity { user_id: 5, roles: RoleSet::parse("school_admin:1"), impersonator: None };
        let denied = auth.impersonate(&school, target.id).await;
        assert!(matches!(denied, Err(AppError::Forbidden { .. })));
    }
}
