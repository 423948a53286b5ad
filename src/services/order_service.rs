// src/services/order_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    common::error::AppError,
    db::Store,
    filter::Expand,
    middleware::rbac::{owner_claims, require_owner, require_visible},
    models::{
        auth::Identity,
        change_log::{ChangeLogEntry, ChangeSet},
        delivery::{Order, UpdateOrderPayload},
    },
    services::{
        audit::{diff, redact, ORDER_FIELDS},
        delivery_service::check_vendor,
    },
};

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, identity: &Identity, id: i64, expand: &Expand) -> Result<Order, AppError> {
        let mut order = self.find_visible(identity, id).await?;

        if expand.has("vendor") {
            if let Some(vendor_id) = order.vendor_id {
                order.vendor = self.store.find_vendor(vendor_id).await?;
            }
        }
        Ok(order)
    }

    /// Atualização auditada de um pedido (admin ou a escola da entrega).
    pub async fn update(&self, identity: &Identity, id: i64, payload: UpdateOrderPayload) -> Result<Order, AppError> {
        let current = self.find_owned(identity, id).await?;

        let read_version = payload.updated_at.unwrap_or(current.updated_at);
        let mut next = current.clone();
        payload.apply(&mut next);

        if next.vendor_id != current.vendor_id {
            check_vendor(self.store.as_ref(), next.vendor_id).await?;
        }

        let changes = ChangeSet {
            changed_by: identity.user_id,
            changed_at: Utc::now(),
            read_version,
            changes: diff(ORDER_FIELDS, &current, &next),
        };

        let updated = self.store.update_order(&next, &changes).await.inspect_err(|err| {
            if let AppError::DatabaseError(e) = err {
                tracing::error!(target: "audit", order_id = id, error = %e, "falha ao gravar pedido auditado");
            }
        })?;

        tracing::info!(
            target: "audit",
            order_id = id,
            changed_by = identity.user_id,
            impersonator = ?identity.impersonator,
            fields = changes.changes.len(),
            "pedido atualizado"
        );
        Ok(updated)
    }

    pub async fn delete(&self, identity: &Identity, id: i64) -> Result<(), AppError> {
        self.find_owned(identity, id).await?;
        if !self.store.delete_order(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(order_id = id, "pedido removido");
        Ok(())
    }

    pub async fn logs(&self, identity: &Identity, id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        self.find_visible(identity, id).await?;
        let entries = self.store.order_logs(id).await?;
        Ok(redact(ORDER_FIELDS, entries))
    }

    async fn school_of(&self, order: &Order) -> Result<Option<i64>, AppError> {
        match order.delivery_id {
            Some(delivery_id) => Ok(self.store.find_delivery(delivery_id).await?.and_then(|d| d.school_id)),
            None => Ok(None),
        }
    }

    // Escrita: admin ou school_admin da escola da entrega, senão 403
    async fn find_owned(&self, identity: &Identity, id: i64) -> Result<Order, AppError> {
        let order = self.store.find_order(id).await?.ok_or(AppError::NotFound)?;
        if !identity.roles.is_admin() {
            let school_id = self.school_of(&order).await?;
            require_owner(&identity.roles, &owner_claims(school_id, &[]))?;
        }
        Ok(order)
    }

    // Visível ao admin, à escola da entrega e ao fornecedor do próprio pedido
    async fn find_visible(&self, identity: &Identity, id: i64) -> Result<Order, AppError> {
        let order = self.store.find_order(id).await?.ok_or(AppError::NotFound)?;
        if identity.roles.is_admin() {
            return Ok(order);
        }

        let school_id = self.school_of(&order).await?;
        let vendors: Vec<i64> = order.vendor_id.into_iter().collect();
        require_visible(&identity.roles, &owner_claims(school_id, &vendors))?;
        Ok(order)
    }
}
