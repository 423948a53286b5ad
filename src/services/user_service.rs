// src/services/user_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::Store,
    filter::{users::UserFilterParams, Expand, PaginatedResponse, QueryOptions},
    models::auth::{CreateUserPayload, NewUser, UpdateUserPayload, User},
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    options: QueryOptions,
    base_url: String,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, options: QueryOptions, base_url: String) -> Self {
        Self { store, options, base_url }
    }

    pub async fn list(&self, params: UserFilterParams) -> Result<PaginatedResponse<User>, AppError> {
        let (query, expand) = params.into_query(&self.options);
        let result = self.store.query_users(&query).await?;

        let mut response = result.into_response(query.page);
        self.expand_all(&mut response.data, &expand).await?;
        Ok(response)
    }

    pub async fn get(&self, id: i64, expand: &Expand) -> Result<User, AppError> {
        let user = self.store.find_user(id).await?.ok_or(AppError::NotFound)?;
        let mut users = vec![user];
        self.expand_all(&mut users, expand).await?;
        users.pop().ok_or(AppError::NotFound)
    }

    pub async fn create(&self, payload: CreateUserPayload) -> Result<User, AppError> {
        self.check_avatar(payload.avatar_id).await?;

        // 1. Hash explícito antes de persistir
        let password_hash = hash_password(&payload.password).await?;

        // 2. Grava
        let user = self
            .store
            .insert_user(NewUser {
                name: payload.name,
                email: payload.email,
                password_hash,
                phone: payload.phone,
                roles: payload.roles,
                avatar_id: payload.avatar_id,
            })
            .await?;

        tracing::info!(user_id = user.id, roles = %user.roles, "usuário criado");
        Ok(user)
    }

    pub async fn update(&self, id: i64, payload: UpdateUserPayload) -> Result<User, AppError> {
        let mut user = self.store.find_user(id).await?.ok_or(AppError::NotFound)?;

        if let Some(name) = payload.name {
            user.name = name;
        }
        if let Some(email) = payload.email {
            user.email = email;
        }
        if let Some(password) = payload.password {
            user.password_hash = hash_password(&password).await?;
        }
        if let Some(phone) = payload.phone {
            user.phone = phone;
        }
        if let Some(roles) = payload.roles {
            user.roles = roles;
        }
        if let Some(avatar_id) = payload.avatar_id {
            self.check_avatar(avatar_id).await?;
            user.avatar_id = avatar_id;
        }

        let user = self.store.update_user(&user).await?;
        tracing::info!(user_id = user.id, "usuário atualizado");
        Ok(user)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.store.soft_delete_user(id, Utc::now()).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(user_id = id, "usuário removido (soft delete)");
        Ok(())
    }

    async fn check_avatar(&self, avatar_id: Option<i64>) -> Result<(), AppError> {
        if let Some(id) = avatar_id {
            if self.store.find_file(id).await?.is_none() {
                return Err(AppError::invalid_field("avatarId", "Arquivo não encontrado."));
            }
        }
        Ok(())
    }

    // expand=avatar: carrega o arquivo e deriva a URL pública
    async fn expand_all(&self, users: &mut [User], expand: &Expand) -> Result<(), AppError> {
        if !expand.has("avatar") {
            return Ok(());
        }
        for user in users.iter_mut() {
            if let Some(id) = user.avatar_id {
                user.avatar = self
                    .store
                    .find_file(id)
                    .await?
                    .map(|file| file.with_url(&self.base_url));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> UserService {
        UserService::new(store, QueryOptions::default(), "https://cdn.exemplo.org/".into())
    }

    fn payload(email: &str, roles: &str) -> CreateUserPayload {
        CreateUserPayload {
            name: "Bia".into(),
            email: email.into(),
            password: "segredo1".into(),
            phone: String::new(),
            roles: roles.into(),
            avatar_id: None,
        }
    }

    #[tokio::test]
    async fn avatar_url_is_derived_on_expand() {
        let store = Arc::new(MemoryStore::new());
        let file = store.insert_file("avatars/bia.png").unwrap();
        let users = service(store.clone());

        let created = users
            .create(CreateUserPayload { avatar_id: Some(file.id), ..payload("bia@x.org", "admin") })
            .await
            .unwrap();

        let plain = users.get(created.id, &Expand::default()).await.unwrap();
        assert!(plain.avatar.is_none());

        let expanded = users
            .get(created.id, &Expand::new(vec!["avatar".into()]))
            .await
            .unwrap();
        assert_eq!(
            expanded.avatar.and_then(|f| f.url).as_deref(),
            Some("https://cdn.exemplo.org/api/uploads/avatars/bia.png")
        );
    }

    #[tokio::test]
    async fn unknown_avatar_is_rejected() {
        let users = service(Arc::new(MemoryStore::new()));
        let result = users
            .create(CreateUserPayload { avatar_id: Some(404), ..payload("c@x.org", "admin") })
            .await;
        assert!(matches!(result, Err(AppError::InvalidField { .. })));
    }

    #[tokio::test]
    async fn soft_deleted_users_disappear_from_lists() {
        let store = Arc::new(MemoryStore::new());
        let users = service(store.clone());
        let a = users.create(payload("a@x.org", "school_admin:1")).await.unwrap();
        users.create(payload("b@x.org", "vendor_admin:2")).await.unwrap();

        users.delete(a.id).await.unwrap();

        let page = users.list(UserFilterParams::default()).await.unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.meta.total_unfiltered, 1);
        assert!(matches!(users.get(a.id, &Expand::default()).await, Err(AppError::NotFound)));
    }
}
