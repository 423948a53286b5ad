// src/services/school_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::Store,
    filter::{schools::SchoolFilterParams, Expand, PaginatedResponse, QueryOptions},
    middleware::rbac::{owner_claims, require_owner, require_visible, scoped_ids},
    models::{
        auth::{Identity, User},
        roles::RoleName,
        school::{CreateSchoolPayload, School, UpdateSchoolPayload},
    },
};

/// Confere que o contato referenciado é um usuário ativo.
pub(crate) async fn check_contact(store: &dyn Store, contact_id: Option<i64>) -> Result<(), AppError> {
    if let Some(id) = contact_id {
        if store.find_user(id).await?.is_none() {
            return Err(AppError::invalid_field("contactId", "Usuário não encontrado."));
        }
    }
    Ok(())
}

/// Carrega os contatos de uma vez, indexados por ID.
pub(crate) async fn load_contacts(
    store: &dyn Store,
    contact_ids: impl Iterator<Item = i64>,
) -> Result<HashMap<i64, User>, AppError> {
    let mut ids: Vec<i64> = contact_ids.collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = store.users_by_ids(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id, u)).collect())
}

#[derive(Clone)]
pub struct SchoolService {
    store: Arc<dyn Store>,
    options: QueryOptions,
}

impl SchoolService {
    pub fn new(store: Arc<dyn Store>, options: QueryOptions) -> Self {
        Self { store, options }
    }

    // Quem não é admin só enxerga as escolas dos seus papéis school_admin
    pub async fn list(
        &self,
        identity: &Identity,
        params: SchoolFilterParams,
    ) -> Result<PaginatedResponse<School>, AppError> {
        let visible = scoped_ids(&identity.roles, &RoleName::SchoolAdmin);
        let (query, expand) = params.into_query(&self.options, visible);
        let result = self.store.query_schools(&query).await?;

        let mut response = result.into_response(query.page);
        self.expand_all(&mut response.data, &expand).await?;
        Ok(response)
    }

    pub async fn get(&self, identity: &Identity, id: i64, expand: &Expand) -> Result<School, AppError> {
        require_visible(&identity.roles, &owner_claims(Some(id), &[]))?;

        let school = self.store.find_school(id).await?.ok_or(AppError::NotFound)?;
        let mut schools = vec![school];
        self.expand_all(&mut schools, expand).await?;
        schools.pop().ok_or(AppError::NotFound)
    }

    pub async fn create(&self, payload: CreateSchoolPayload) -> Result<School, AppError> {
        check_contact(self.store.as_ref(), payload.contact_id).await?;
        let school = self.store.insert_school(payload.into()).await?;
        tracing::info!(school_id = school.id, "escola criada");
        Ok(school)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: i64,
        payload: UpdateSchoolPayload,
    ) -> Result<School, AppError> {
        let mut school = self.store.find_school(id).await?.ok_or(AppError::NotFound)?;
        require_owner(&identity.roles, &owner_claims(Some(school.id), &[]))?;

        if let Some(contact_id) = payload.contact_id {
            check_contact(self.store.as_ref(), contact_id).await?;
        }
        payload.apply(&mut school);

        let school = self.store.update_school(&school).await?;
        tracing::info!(school_id = school.id, changed_by = identity.user_id, "escola atualizada");
        Ok(school)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.store.delete_school(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(school_id = id, "escola removida");
        Ok(())
    }

    // expand=contact
    async fn expand_all(&self, schools: &mut [School], expand: &Expand) -> Result<(), AppError> {
        if !expand.has("contact") {
            return Ok(());
        }
        let contacts = load_contacts(self.store.as_ref(), schools.iter().filter_map(|s| s.contact_id)).await?;
        for school in schools.iter_mut() {
            school.contact = school.contact_id.and_then(|id| contacts.get(&id).cloned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{auth::NewUser, roles::RoleSet, school::NewSchool};

    fn identity(roles: &str) -> Identity {
        Identity { user_id: 1, roles: RoleSet::parse(roles), impersonator: None }
    }

    async fn seeded() -> (SchoolService, Vec<School>) {
        let store = Arc::new(MemoryStore::new());
        let mut schools = Vec::new();
        for name in ["EMEF Norte", "EMEF Sul", "EMEI Leste"] {
            let school = store
                .insert_school(NewSchool {
                    name: name.into(),
                    address: String::new(),
                    latitude: 0.0,
                    longitude: 0.0,
                    contact_id: None,
                })
                .await
                .unwrap();
            schools.push(school);
        }
        (SchoolService::new(store, QueryOptions::default()), schools)
    }

    #[tokio::test]
    async fn school_admin_list_is_narrowed_to_their_schools() {
        let (service, schools) = seeded().await;
        let caller = identity(&format!("school_admin:{}", schools[1].id));

        let page = service.list(&caller, SchoolFilterParams::default()).await.unwrap();
        assert_eq!(page.data.iter().map(|s| s.id).collect::<Vec<_>>(), vec![schools[1].id]);
        assert_eq!(page.meta.total_unfiltered, 1);

        let admin = service.list(&identity("admin"), SchoolFilterParams::default()).await.unwrap();
        assert_eq!(admin.meta.total, 3);
    }

    #[tokio::test]
    async fn foreign_school_reads_as_not_found_and_update_is_forbidden() {
        let (service, schools) = seeded().await;
        let caller = identity(&format!("school_admin:{}", schools[0].id));

        let read = service.get(&caller, schools[2].id, &Expand::default()).await;
        assert!(matches!(read, Err(AppError::NotFound)));

        let write = service
            .update(&caller, schools[2].id, UpdateSchoolPayload { name: Some("X".into()), ..Default::default() })
            .await;
        assert!(matches!(write, Err(AppError::Forbidden { .. })));

        let own = service
            .update(&caller, schools[0].id, UpdateSchoolPayload { name: Some("EMEF Centro".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(own.name, "EMEF Centro");
    }

    #[tokio::test]
    async fn contact_is_expanded_on_request() {
        let store = Arc::new(MemoryStore::new());
        let contact = store
            .insert_user(NewUser {
                name: "Rita".into(),
                email: "rita@x.org".into(),
                password_hash: "h".into(),
                phone: String::new(),
                roles: "school_admin:1".into(),
                avatar_id: None,
            })
            .await
            .unwrap();
        let service = SchoolService::new(store, QueryOptions::default());
        let school = service
            .create(CreateSchoolPayload {
                name: "EMEF Oeste".into(),
                address: String::new(),
                latitude: 0.0,
                longitude: 0.0,
                contact_id: Some(contact.id),
            })
            .await
            .unwrap();

        let expanded = service
            .get(&identity("admin"), school.id, &Expand::new(vec!["contact".into()]))
            .await
            .unwrap();
        assert_eq!(expanded.contact.map(|c| c.name).as_deref(), Some("Rita"));
    }
}
