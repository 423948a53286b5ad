// src/services/vendor_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::Store,
    filter::{vendors::VendorFilterParams, Expand, PaginatedResponse, QueryOptions},
    middleware::rbac::{owner_claims, require_owner, require_visible, scoped_ids},
    models::{
        auth::Identity,
        roles::RoleName,
        vendor::{CreateVendorPayload, UpdateVendorPayload, Vendor},
    },
    services::school_service::{check_contact, load_contacts},
};

#[derive(Clone)]
pub struct VendorService {
    store: Arc<dyn Store>,
    options: QueryOptions,
}

impl VendorService {
    pub fn new(store: Arc<dyn Store>, options: QueryOptions) -> Self {
        Self { store, options }
    }

    pub async fn list(
        &self,
        identity: &Identity,
        params: VendorFilterParams,
    ) -> Result<PaginatedResponse<Vendor>, AppError> {
        let visible = scoped_ids(&identity.roles, &RoleName::VendorAdmin);
        let (query, expand) = params.into_query(&self.options, visible);
        let result = self.store.query_vendors(&query).await?;

        let mut response = result.into_response(query.page);
        self.expand_all(&mut response.data, &expand).await?;
        Ok(response)
    }

    pub async fn get(&self, identity: &Identity, id: i64, expand: &Expand) -> Result<Vendor, AppError> {
        require_visible(&identity.roles, &owner_claims(None, &[id]))?;

        let vendor = self.store.find_vendor(id).await?.ok_or(AppError::NotFound)?;
        let mut vendors = vec![vendor];
        self.expand_all(&mut vendors, expand).await?;
        vendors.pop().ok_or(AppError::NotFound)
    }

    pub async fn create(&self, payload: CreateVendorPayload) -> Result<Vendor, AppError> {
        check_contact(self.store.as_ref(), payload.contact_id).await?;
        let vendor = self.store.insert_vendor(payload.into()).await?;
        tracing::info!(vendor_id = vendor.id, category = %vendor.category, "fornecedor criado");
        Ok(vendor)
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: i64,
        payload: UpdateVendorPayload,
    ) -> Result<Vendor, AppError> {
        let mut vendor = self.store.find_vendor(id).await?.ok_or(AppError::NotFound)?;
        require_owner(&identity.roles, &owner_claims(None, &[vendor.id]))?;

        if let Some(contact_id) = payload.contact_id {
            check_contact(self.store.as_ref(), contact_id).await?;
        }
        payload.apply(&mut vendor);

        let vendor = self.store.update_vendor(&vendor).await?;
        tracing::info!(vendor_id = vendor.id, changed_by = identity.user_id, "fornecedor atualizado");
        Ok(vendor)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.store.delete_vendor(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(vendor_id = id, "fornecedor removido");
        Ok(())
    }

    async fn expand_all(&self, vendors: &mut [Vendor], expand: &Expand) -> Result<(), AppError> {
        if !expand.has("contact") {
            return Ok(());
        }
        let contacts = load_contacts(self.store.as_ref(), vendors.iter().filter_map(|v| v.contact_id)).await?;
        for vendor in vendors.iter_mut() {
            vendor.contact = vendor.contact_id.and_then(|id| contacts.get(&id).cloned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{roles::RoleSet, vendor::VendorCategory};

    fn identity(roles: &str) -> Identity {
        Identity { user_id: 1, roles: RoleSet::parse(roles), impersonator: None }
    }

    fn payload(name: &str, category: VendorCategory) -> CreateVendorPayload {
        CreateVendorPayload {
            name: name.into(),
            address: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            category,
            contact_id: None,
        }
    }

    #[tokio::test]
    async fn vendor_admin_sees_only_their_vendor() {
        let service = VendorService::new(Arc::new(MemoryStore::new()), QueryOptions::default());
        let a = service.create(payload("Hortifruti A", VendorCategory::Produce)).await.unwrap();
        let b = service.create(payload("Caixas B", VendorCategory::Packaging)).await.unwrap();

        let caller = identity(&format!("vendor_admin:{}", b.id));
        let page = service.list(&caller, VendorFilterParams::default()).await.unwrap();
        assert_eq!(page.data.iter().map(|v| v.id).collect::<Vec<_>>(), vec![b.id]);

        let hidden = service.get(&caller, a.id, &Expand::default()).await;
        assert!(matches!(hidden, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn category_filter_ignores_unknown_values() {
        let service = VendorService::new(Arc::new(MemoryStore::new()), QueryOptions::default());
        service.create(payload("Hortifruti A", VendorCategory::Produce)).await.unwrap();
        service.create(payload("Grãos C", VendorCategory::ShelfStable)).await.unwrap();

        let params = VendorFilterParams {
            types: vec!["shelf_stable".into(), "toys".into()],
            ..Default::default()
        };
        let page = service.list(&identity("admin"), params).await.unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.meta.total_unfiltered, 2);
        assert_eq!(page.data[0].name, "Grãos C");
    }
}
