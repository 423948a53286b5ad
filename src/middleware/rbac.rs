// src/middleware/rbac.rs
//
// Autorização em duas camadas:
// 1. `RequireRole<G>` no handler: portão grosso, só o nome do papel.
// 2. Funções de posse usadas pelos serviços: comparam (papel, entidade) exatamente.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    filter::deliveries::DeliveryCondition,
    models::{
        auth::Identity,
        delivery::Order,
        roles::{RoleClaim, RoleName, RoleSet, ADMIN, SCHOOL_ADMIN, VENDOR_ADMIN},
    },
};

/// 1. O trait que define um conjunto de papéis aceitos
pub trait RoleGate: Send + Sync + 'static {
    fn allowed() -> &'static [&'static str];
}

/// 2. O extrator (guardião)
pub struct RequireRole<G>(pub PhantomData<G>);

// 3. Implementação do FromRequestParts
impl<G, S> FromRequestParts<S> for RequireRole<G>
where
    G: RoleGate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A. Principal colocado pelo auth_guard
        let identity = parts
            .extensions
            .get::<Identity>()
            .ok_or(AppError::AuthenticationRequired)?;

        // B. Confere o nome do papel
        require_any_role(&identity.roles, G::allowed())?;

        Ok(RequireRole(PhantomData))
    }
}

pub fn require_any_role(roles: &RoleSet, allowed: &[&str]) -> Result<(), AppError> {
    if roles.has_any_role(allowed) {
        Ok(())
    } else {
        Err(AppError::forbidden(allowed.iter().copied()))
    }
}

// ---
// DEFINIÇÃO DOS PORTÕES (TIPOS)
// ---

pub struct AdminOnly;
impl RoleGate for AdminOnly {
    fn allowed() -> &'static [&'static str] { &[ADMIN] }
}

pub struct SchoolStaff;
impl RoleGate for SchoolStaff {
    fn allowed() -> &'static [&'static str] { &[ADMIN, SCHOOL_ADMIN] }
}

pub struct VendorStaff;
impl RoleGate for VendorStaff {
    fn allowed() -> &'static [&'static str] { &[ADMIN, VENDOR_ADMIN] }
}

pub struct AnyStaff;
impl RoleGate for AnyStaff {
    fn allowed() -> &'static [&'static str] { &[ADMIN, SCHOOL_ADMIN, VENDOR_ADMIN] }
}

// ---
// Posse de recursos
// ---

/// Papéis que dão autoridade sobre um recurso da escola `school_id` com pedidos de `vendor_ids`.
pub fn owner_claims(school_id: Option<i64>, vendor_ids: &[i64]) -> Vec<RoleClaim> {
    let mut claims = vec![RoleClaim::admin()];
    claims.extend(school_id.map(RoleClaim::school_admin));
    claims.extend(vendor_ids.iter().copied().map(RoleClaim::vendor_admin));
    claims
}

/// 403 com a lista exata de papéis que teriam passado.
pub fn require_owner(roles: &RoleSet, required: &[RoleClaim]) -> Result<(), AppError> {
    if roles.holds_any(required) {
        Ok(())
    } else {
        Err(AppError::forbidden(required.iter().map(ToString::to_string)))
    }
}

/// Leitura por quem não é dono responde 404: não confirma que o recurso existe.
pub fn require_visible(roles: &RoleSet, required: &[RoleClaim]) -> Result<(), AppError> {
    if roles.holds_any(required) {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

/// IDs visíveis de um tipo de entidade; `None` quando não há recorte (admin).
pub fn scoped_ids(roles: &RoleSet, role: &RoleName) -> Option<Vec<i64>> {
    if roles.is_admin() {
        None
    } else {
        Some(roles.entity_ids(role))
    }
}

/// Recorte de acesso da listagem de entregas.
pub fn delivery_scope(roles: &RoleSet) -> Option<DeliveryCondition> {
    if roles.is_admin() {
        return None;
    }
    Some(DeliveryCondition::VisibleTo {
        schools: roles.entity_ids(&RoleName::SchoolAdmin),
        vendors: roles.entity_ids(&RoleName::VendorAdmin),
    })
}

/// Pedidos aninhados que o chamador pode ver numa entrega da escola `school_id`.
/// Admin e o dono da escola veem todos; os demais só os dos seus fornecedores.
pub fn retain_visible_orders(roles: &RoleSet, school_id: Option<i64>, orders: &mut Vec<Order>) {
    let sees_all = roles.is_admin() || school_id.is_some_and(|id| roles.holds(&RoleClaim::school_admin(id)));
    if !sees_all {
        orders.retain(|o| {
            o.vendor_id
                .is_some_and(|vendor| roles.holds(&RoleClaim::vendor_admin(vendor)))
        });
    }
}
