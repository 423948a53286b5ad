// src/services/delivery_service.rs

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::Store,
    filter::{deliveries::DeliveryFilterParams, Expand, PaginatedResponse, QueryOptions},
    middleware::rbac::{delivery_scope, owner_claims, require_owner, require_visible, retain_visible_orders},
    models::{
        auth::Identity,
        change_log::{ChangeLogEntry, ChangeSet},
        delivery::{
            CreateDeliveryPayload, CreateOrderPayload, Delivery, NewDelivery, Order, OrderStatus,
            UpdateDeliveryPayload,
        },
        roles::RoleSet,
        school::School,
        vendor::Vendor,
    },
    services::audit::{diff, redact, DELIVERY_FIELDS},
};

/// Confere que a escola referenciada existe.
async fn check_school(store: &dyn Store, school_id: Option<i64>) -> Result<(), AppError> {
    if let Some(id) = school_id {
        if store.find_school(id).await?.is_none() {
            return Err(AppError::invalid_field("schoolId", "Escola não encontrada."));
        }
    }
    Ok(())
}

pub(crate) async fn check_vendor(store: &dyn Store, vendor_id: Option<i64>) -> Result<(), AppError> {
    if let Some(id) = vendor_id {
        if store.find_vendor(id).await?.is_none() {
            return Err(AppError::invalid_field("vendorId", "Fornecedor não encontrado."));
        }
    }
    Ok(())
}

pub(crate) async fn load_vendors(store: &dyn Store, orders: &[Order]) -> Result<HashMap<i64, Vendor>, AppError> {
    let mut ids: Vec<i64> = orders.iter().filter_map(|o| o.vendor_id).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let vendors = store.vendors_by_ids(&ids).await?;
    Ok(vendors.into_iter().map(|v| (v.id, v)).collect())
}

#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn Store>,
    options: QueryOptions,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn Store>, options: QueryOptions) -> Self {
        Self { store, options }
    }

    /// Listagem com o recorte de acesso do chamador somado aos filtros pedidos.
    pub async fn list(
        &self,
        identity: &Identity,
        params: DeliveryFilterParams,
    ) -> Result<PaginatedResponse<Delivery>, AppError> {
        let scope = delivery_scope(&identity.roles);
        let (query, expand) = params.into_query(&self.options, scope)?;
        let result = self.store.query_deliveries(&query).await?;

        let mut response = result.into_response(query.page);
        self.enrich(&identity.roles, &mut response.data, &expand).await?;
        Ok(response)
    }

    pub async fn get(&self, identity: &Identity, id: i64, expand: &Expand) -> Result<Delivery, AppError> {
        let delivery = self.find_visible(identity, id).await?;
        let mut deliveries = vec![delivery];
        self.enrich(&identity.roles, &mut deliveries, expand).await?;
        deliveries.pop().ok_or(AppError::NotFound)
    }

    pub async fn create(&self, identity: &Identity, payload: CreateDeliveryPayload) -> Result<Delivery, AppError> {
        let new_delivery: NewDelivery = payload.into();
        check_school(self.store.as_ref(), new_delivery.school_id).await?;
        require_owner(&identity.roles, &owner_claims(new_delivery.school_id, &[]))?;

        let delivery = self.store.insert_delivery(new_delivery).await?;
        tracing::info!(delivery_id = delivery.id, "entrega criada");
        Ok(delivery)
    }

    /// Atualização auditada: diff contra o estado lido, gravado junto com a entrega.
    pub async fn update(
        &self,
        identity: &Identity,
        id: i64,
        payload: UpdateDeliveryPayload,
    ) -> Result<Delivery, AppError> {
        // 1. Estado atual e posse (admin ou a escola dona)
        let current = self.find_owned(identity, id).await?;

        // 2. Aplica o payload numa cópia
        let read_version = payload.updated_at.unwrap_or(current.updated_at);
        let mut next = current.clone();
        payload.apply(&mut next);

        if next.school_id != current.school_id {
            check_school(self.store.as_ref(), next.school_id).await?;
            // Mover para outra escola exige autoridade também sobre o destino
            require_owner(&identity.roles, &owner_claims(next.school_id, &[]))?;
        }

        // 3. Diff e gravação atômica
        let changes = ChangeSet {
            changed_by: identity.user_id,
            changed_at: Utc::now(),
            read_version,
            changes: diff(DELIVERY_FIELDS, &current, &next),
        };

        let updated = self.store.update_delivery(&next, &changes).await.inspect_err(|err| {
            if let AppError::DatabaseError(e) = err {
                tracing::error!(target: "audit", delivery_id = id, error = %e, "falha ao gravar entrega auditada");
            }
        })?;

        tracing::info!(
            target: "audit",
            delivery_id = id,
            changed_by = identity.user_id,
            impersonator = ?identity.impersonator,
            fields = changes.changes.len(),
            "entrega atualizada"
        );

        let mut deliveries = vec![updated];
        self.enrich(&identity.roles, &mut deliveries, &Expand::default()).await?;
        deliveries.pop().ok_or(AppError::NotFound)
    }

    pub async fn delete(&self, identity: &Identity, id: i64) -> Result<(), AppError> {
        self.find_owned(identity, id).await?;
        if !self.store.delete_delivery(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(delivery_id = id, "entrega removida");
        Ok(())
    }

    pub async fn logs(&self, identity: &Identity, id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        self.find_visible(identity, id).await?;
        let entries = self.store.delivery_logs(id).await?;
        Ok(redact(DELIVERY_FIELDS, entries))
    }

    /// Cria um pedido já vinculado à entrega.
    pub async fn add_order(
        &self,
        identity: &Identity,
        delivery_id: i64,
        payload: CreateOrderPayload,
    ) -> Result<Order, AppError> {
        self.find_owned(identity, delivery_id).await?;
        check_vendor(self.store.as_ref(), payload.vendor_id).await?;

        let order = self.store.insert_order(payload.into_new_order(Some(delivery_id))).await?;
        tracing::info!(delivery_id, order_id = order.id, "pedido adicionado à entrega");
        Ok(order)
    }

    /// Desvincula o pedido; ele continua existindo com `deliveryId = null`.
    pub async fn detach_order(&self, identity: &Identity, delivery_id: i64, order_id: i64) -> Result<(), AppError> {
        self.find_owned(identity, delivery_id).await?;
        let order = self
            .store
            .find_order(order_id)
            .await?
            .filter(|o| o.delivery_id == Some(delivery_id))
            .ok_or(AppError::NotFound)?;

        let mut detached = order.clone();
        detached.delivery_id = None;
        // deliveryId não é campo rastreado: nenhuma linha de auditoria
        let changes = ChangeSet {
            changed_by: identity.user_id,
            changed_at: Utc::now(),
            read_version: order.updated_at,
            changes: Vec::new(),
        };
        self.store.update_order(&detached, &changes).await?;

        tracing::info!(delivery_id, order_id, "pedido desvinculado da entrega");
        Ok(())
    }

    // Escrita: admin ou school_admin da escola da entrega, senão 403
    async fn find_owned(&self, identity: &Identity, id: i64) -> Result<Delivery, AppError> {
        let delivery = self.store.find_delivery(id).await?.ok_or(AppError::NotFound)?;
        require_owner(&identity.roles, &owner_claims(delivery.school_id, &[]))?;
        Ok(delivery)
    }

    // Entrega visível ao chamador; caso contrário 404 (não confirma que existe)
    async fn find_visible(&self, identity: &Identity, id: i64) -> Result<Delivery, AppError> {
        let delivery = self.store.find_delivery(id).await?.ok_or(AppError::NotFound)?;
        if identity.roles.is_admin() {
            return Ok(delivery);
        }

        let orders = self.store.orders_for_deliveries(&[id]).await?;
        let vendor_ids: Vec<i64> = orders.iter().filter_map(|o| o.vendor_id).collect();
        require_visible(&identity.roles, &owner_claims(delivery.school_id, &vendor_ids))?;
        Ok(delivery)
    }

    // Status derivado sempre; escola, pedidos e fornecedores conforme `expand`
    async fn enrich(&self, roles: &RoleSet, deliveries: &mut [Delivery], expand: &Expand) -> Result<(), AppError> {
        if deliveries.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = deliveries.iter().map(|d| d.id).collect();
        let orders = self.store.orders_for_deliveries(&ids).await?;

        let with_vendor = expand.has("orders.vendor");
        let with_orders = with_vendor || expand.has("orders");
        let vendors = if with_vendor {
            load_vendors(self.store.as_ref(), &orders).await?
        } else {
            HashMap::new()
        };

        let schools: HashMap<i64, School> = if expand.has("school") {
            let mut school_ids: Vec<i64> = deliveries.iter().filter_map(|d| d.school_id).collect();
            school_ids.sort_unstable();
            school_ids.dedup();
            self.store
                .schools_by_ids(&school_ids)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        } else {
            HashMap::new()
        };

        let mut by_delivery: HashMap<i64, Vec<Order>> = HashMap::new();
        for order in orders {
            if let Some(delivery_id) = order.delivery_id {
                by_delivery.entry(delivery_id).or_default().push(order);
            }
        }

        for delivery in deliveries.iter_mut() {
            let mut own = by_delivery.remove(&delivery.id).unwrap_or_default();
            // Status calculado sobre todos os pedidos, antes do recorte por fornecedor
            delivery.status = OrderStatus::derive(own.iter().map(|o| &o.status));

            if with_orders {
                retain_visible_orders(roles, delivery.school_id, &mut own);
                for order in own.iter_mut() {
                    order.vendor = order.vendor_id.and_then(|id| vendors.get(&id).cloned());
                }
                delivery.orders = Some(own);
            }

            if let Some(school_id) = delivery.school_id {
                delivery.school = schools.get(&school_id).cloned();
            }
        }
        Ok(())
    }
}
