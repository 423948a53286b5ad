// src/db/memory.rs
//
// Store em memória para testes e desenvolvimento local.
// Reproduz as regras do banco: e-mail único entre usuários ativos, FKs com SET NULL,
// atualização condicional a `updated_at` e auditoria atômica.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    db::store::Store,
    filter::{
        apply_in_memory,
        deliveries::{DeliveryQuery, DeliveryRow},
        schools::SchoolQuery,
        users::UserQuery,
        vendors::VendorQuery,
        QueryResult,
    },
    models::{
        auth::{NewUser, RefreshToken, User},
        change_log::{ChangeLogEntry, ChangeSet},
        delivery::{Delivery, NewDelivery, NewOrder, Order},
        file::File,
        school::{NewSchool, School},
        vendor::{NewVendor, Vendor},
    },
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    files: BTreeMap<i64, File>,
    users: BTreeMap<i64, User>,
    schools: BTreeMap<i64, School>,
    vendors: BTreeMap<i64, Vendor>,
    deliveries: BTreeMap<i64, Delivery>,
    orders: BTreeMap<i64, Order>,
    delivery_logs: Vec<ChangeLogEntry>,
    order_logs: Vec<ChangeLogEntry>,
    refresh_tokens: Vec<RefreshToken>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users.values().any(|u| {
            u.is_active() && Some(u.id) != except && u.email.to_lowercase() == email.to_lowercase()
        })
    }

    fn append_logs(&mut self, entity_id: i64, changes: &ChangeSet, delivery: bool) {
        for change in &changes.changes {
            let entry = ChangeLogEntry {
                id: self.next_id(),
                entity_id,
                changed_by: changes.changed_by,
                changed_by_name: None,
                changed_at: changes.changed_at,
                field_name: change.field_name.to_string(),
                old_value: change.old_value.clone(),
                new_value: change.new_value.clone(),
            };
            if delivery {
                self.delivery_logs.push(entry);
            } else {
                self.order_logs.push(entry);
            }
        }
    }

    // Mesmo formato do SELECT com JOIN em users: nome preenchido, mais recentes primeiro
    fn read_logs(&self, logs: &[ChangeLogEntry], entity_id: i64) -> Vec<ChangeLogEntry> {
        let mut entries: Vec<ChangeLogEntry> = logs
            .iter()
            .filter(|l| l.entity_id == entity_id)
            .cloned()
            .map(|mut l| {
                l.changed_by_name = self.users.get(&l.changed_by).map(|u| u.name.clone());
                l
            })
            .collect();
        entries.sort_by(|a, b| b.changed_at.cmp(&a.changed_at).then(b.id.cmp(&a.id)));
        entries
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow!("store em memória envenenado")))
    }

    /// Registra um arquivo já enviado (o upload em si fica fora desta API).
    pub fn insert_file(&self, path: &str) -> Result<File, AppError> {
        let mut t = self.tables()?;
        let file = File {
            id: t.next_id(),
            path: path.to_string(),
            url: None,
            created_at: Utc::now(),
        };
        t.files.insert(file.id, file.clone());
        Ok(file)
    }
}

fn conflict(entity: &str) -> AppError {
    AppError::Conflict(format!("{entity} foi alterado(a) por outra requisição."))
}

#[async_trait]
impl Store for MemoryStore {
    // --- Usuários ---

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let t = self.tables()?;
        Ok(t.users.get(&id).filter(|u| u.is_active()).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let t = self.tables()?;
        let email = email.to_lowercase();
        Ok(t
            .users
            .values()
            .find(|u| u.is_active() && u.email.to_lowercase() == email)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut t = self.tables()?;
        if t.email_taken(&user.email, None) {
            return Err(AppError::EmailAlreadyExists);
        }
        let now = Utc::now();
        let user = User {
            id: t.next_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            phone: user.phone,
            roles: user.roles,
            avatar_id: user.avatar_id,
            avatar: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<User, AppError> {
        let mut t = self.tables()?;
        if !t.users.get(&user.id).is_some_and(|u| u.is_active()) {
            return Err(AppError::NotFound);
        }
        if t.email_taken(&user.email, Some(user.id)) {
            return Err(AppError::EmailAlreadyExists);
        }
        let mut updated = user.clone();
        updated.avatar = None;
        updated.updated_at = Utc::now();
        t.users.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn soft_delete_user(&self, id: i64, at: DateTime<Utc>) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        match t.users.get_mut(&id) {
            Some(user) if user.is_active() => user.deleted_at = Some(at),
            _ => return Ok(false),
        }
        for school in t.schools.values_mut().filter(|s| s.contact_id == Some(id)) {
            school.contact_id = None;
        }
        for vendor in t.vendors.values_mut().filter(|v| v.contact_id == Some(id)) {
            vendor.contact_id = None;
        }
        t.refresh_tokens.retain(|r| r.user_id != id);
        Ok(true)
    }

    async fn query_users(&self, query: &UserQuery) -> Result<QueryResult<User>, AppError> {
        let t = self.tables()?;
        Ok(apply_in_memory(t.users.values().cloned().collect(), query))
    }

    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        let t = self.tables()?;
        Ok(ids
            .iter()
            .filter_map(|id| t.users.get(id))
            .filter(|u| u.is_active())
            .cloned()
            .collect())
    }

    async fn find_file(&self, id: i64) -> Result<Option<File>, AppError> {
        let t = self.tables()?;
        Ok(t.files.get(&id).cloned())
    }

    // --- Escolas ---

    async fn find_school(&self, id: i64) -> Result<Option<School>, AppError> {
        let t = self.tables()?;
        Ok(t.schools.get(&id).cloned())
    }

    async fn insert_school(&self, school: NewSchool) -> Result<School, AppError> {
        let mut t = self.tables()?;
        let now = Utc::now();
        let school = School {
            id: t.next_id(),
            name: school.name,
            address: school.address,
            latitude: school.latitude,
            longitude: school.longitude,
            contact_id: school.contact_id,
            contact: None,
            created_at: now,
            updated_at: now,
        };
        t.schools.insert(school.id, school.clone());
        Ok(school)
    }

    async fn update_school(&self, school: &School) -> Result<School, AppError> {
        let mut t = self.tables()?;
        if !t.schools.contains_key(&school.id) {
            return Err(AppError::NotFound);
        }
        let mut updated = school.clone();
        updated.contact = None;
        updated.updated_at = Utc::now();
        t.schools.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_school(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        if t.schools.remove(&id).is_none() {
            return Ok(false);
        }
        for delivery in t.deliveries.values_mut().filter(|d| d.school_id == Some(id)) {
            delivery.school_id = None;
        }
        Ok(true)
    }

    async fn query_schools(&self, query: &SchoolQuery) -> Result<QueryResult<School>, AppError> {
        let t = self.tables()?;
        Ok(apply_in_memory(t.schools.values().cloned().collect(), query))
    }

    async fn schools_by_ids(&self, ids: &[i64]) -> Result<Vec<School>, AppError> {
        let t = self.tables()?;
        Ok(ids.iter().filter_map(|id| t.schools.get(id)).cloned().collect())
    }

    // --- Fornecedores ---

    async fn find_vendor(&self, id: i64) -> Result<Option<Vendor>, AppError> {
        let t = self.tables()?;
        Ok(t.vendors.get(&id).cloned())
    }

    async fn insert_vendor(&self, vendor: NewVendor) -> Result<Vendor, AppError> {
        let mut t = self.tables()?;
        let now = Utc::now();
        let vendor = Vendor {
            id: t.next_id(),
            name: vendor.name,
            address: vendor.address,
            latitude: vendor.latitude,
            longitude: vendor.longitude,
            category: vendor.category,
            contact_id: vendor.contact_id,
            contact: None,
            created_at: now,
            updated_at: now,
        };
        t.vendors.insert(vendor.id, vendor.clone());
        Ok(vendor)
    }

    async fn update_vendor(&self, vendor: &Vendor) -> Result<Vendor, AppError> {
        let mut t = self.tables()?;
        if !t.vendors.contains_key(&vendor.id) {
            return Err(AppError::NotFound);
        }
        let mut updated = vendor.clone();
        updated.contact = None;
        updated.updated_at = Utc::now();
        t.vendors.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn delete_vendor(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        if t.vendors.remove(&id).is_none() {
            return Ok(false);
        }
        for order in t.orders.values_mut().filter(|o| o.vendor_id == Some(id)) {
            order.vendor_id = None;
        }
        Ok(true)
    }

    async fn query_vendors(&self, query: &VendorQuery) -> Result<QueryResult<Vendor>, AppError> {
        let t = self.tables()?;
        Ok(apply_in_memory(t.vendors.values().cloned().collect(), query))
    }

    async fn vendors_by_ids(&self, ids: &[i64]) -> Result<Vec<Vendor>, AppError> {
        let t = self.tables()?;
        Ok(ids.iter().filter_map(|id| t.vendors.get(id)).cloned().collect())
    }

    // --- Entregas ---

    async fn find_delivery(&self, id: i64) -> Result<Option<Delivery>, AppError> {
        let t = self.tables()?;
        Ok(t.deliveries.get(&id).cloned())
    }

    async fn insert_delivery(&self, delivery: NewDelivery) -> Result<Delivery, AppError> {
        let mut t = self.tables()?;
        let now = Utc::now();
        let delivery = Delivery {
            id: t.next_id(),
            contract: delivery.contract,
            package_type: delivery.package_type,
            scheduled_at: delivery.scheduled_at,
            notes: delivery.notes,
            school_id: delivery.school_id,
            created_at: now,
            updated_at: now,
            status: None,
            school: None,
            orders: None,
        };
        t.deliveries.insert(delivery.id, delivery.clone());
        Ok(delivery)
    }

    async fn update_delivery(&self, delivery: &Delivery, changes: &ChangeSet) -> Result<Delivery, AppError> {
        let mut t = self.tables()?;
        match t.deliveries.get(&delivery.id) {
            None => return Err(AppError::NotFound),
            Some(stored) if stored.updated_at != changes.read_version => return Err(conflict("A entrega")),
            Some(_) => {}
        }

        let mut updated = delivery.clone();
        updated.status = None;
        updated.school = None;
        updated.orders = None;
        updated.updated_at = changes.changed_at;
        t.deliveries.insert(updated.id, updated.clone());
        t.append_logs(updated.id, changes, true);
        Ok(updated)
    }

    async fn delete_delivery(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        if t.deliveries.remove(&id).is_none() {
            return Ok(false);
        }
        for order in t.orders.values_mut().filter(|o| o.delivery_id == Some(id)) {
            order.delivery_id = None;
        }
        Ok(true)
    }

    async fn query_deliveries(&self, query: &DeliveryQuery) -> Result<QueryResult<Delivery>, AppError> {
        let t = self.tables()?;
        let rows: Vec<DeliveryRow> = t
            .deliveries
            .values()
            .map(|d| DeliveryRow {
                delivery: d.clone(),
                orders: t
                    .orders
                    .values()
                    .filter(|o| o.delivery_id == Some(d.id))
                    .cloned()
                    .collect(),
                school_name: d
                    .school_id
                    .and_then(|id| t.schools.get(&id))
                    .map(|s| s.name.clone()),
            })
            .collect();

        Ok(apply_in_memory(rows, query).map(|row| row.delivery))
    }

    async fn delivery_logs(&self, delivery_id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        let t = self.tables()?;
        Ok(t.read_logs(&t.delivery_logs, delivery_id))
    }

    // --- Pedidos ---

    async fn find_order(&self, id: i64) -> Result<Option<Order>, AppError> {
        let t = self.tables()?;
        Ok(t.orders.get(&id).cloned())
    }

    async fn orders_for_deliveries(&self, delivery_ids: &[i64]) -> Result<Vec<Order>, AppError> {
        let t = self.tables()?;
        Ok(t
            .orders
            .values()
            .filter(|o| o.delivery_id.is_some_and(|id| delivery_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, AppError> {
        let mut t = self.tables()?;
        let now = Utc::now();
        let order = Order {
            id: t.next_id(),
            delivery_id: order.delivery_id,
            item: order.item,
            quantity: order.quantity,
            unit: order.unit,
            unit_cost: order.unit_cost,
            packed_at: order.packed_at,
            purchased_at: order.purchased_at,
            vendor_id: order.vendor_id,
            is_internal: order.is_internal,
            status: order.status,
            notes: order.notes,
            created_at: now,
            updated_at: now,
            vendor: None,
        };
        t.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update_order(&self, order: &Order, changes: &ChangeSet) -> Result<Order, AppError> {
        let mut t = self.tables()?;
        match t.orders.get(&order.id) {
            None => return Err(AppError::NotFound),
            Some(stored) if stored.updated_at != changes.read_version => return Err(conflict("O pedido")),
            Some(_) => {}
        }

        let mut updated = order.clone();
        updated.vendor = None;
        updated.updated_at = changes.changed_at;
        t.orders.insert(updated.id, updated.clone());
        t.append_logs(updated.id, changes, false);
        Ok(updated)
    }

    async fn delete_order(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        Ok(t.orders.remove(&id).is_some())
    }

    async fn order_logs(&self, order_id: i64) -> Result<Vec<ChangeLogEntry>, AppError> {
        let t = self.tables()?;
        Ok(t.read_logs(&t.order_logs, order_id))
    }

    // --- Refresh tokens ---

    async fn insert_refresh_token(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError> {
        let mut t = self.tables()?;
        let row = RefreshToken {
            id: t.next_id(),
            user_id,
            token: token.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        t.refresh_tokens.push(row.clone());
        Ok(row)
    }

    async fn take_refresh_token(&self, token: &str, now: DateTime<Utc>) -> Result<Option<RefreshToken>, AppError> {
        let mut t = self.tables()?;
        let Some(pos) = t.refresh_tokens.iter().position(|r| r.token == token) else {
            return Ok(None);
        };
        let row = t.refresh_tokens.remove(pos);
        Ok(Some(row).filter(|r| r.expires_at > now))
    }

    async fn delete_refresh_token(&self, token: &str) -> Result<bool, AppError> {
        let mut t = self.tables()?;
        let before = t.refresh_tokens.len();
        t.refresh_tokens.retain(|r| r.token != token);
        Ok(t.refresh_tokens.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::change_log::FieldChange;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".into(),
            email: email.into(),
            password_hash: "hash".into(),
            phone: String::new(),
            roles: "admin".into(),
            avatar_id: None,
        }
    }

    fn new_delivery() -> NewDelivery {
        NewDelivery {
            contract: "active".into(),
            package_type: "box".into(),
            scheduled_at: None,
            notes: String::new(),
            school_id: None,
        }
    }

    #[tokio::test]
    async fn email_is_unique_among_active_users() {
        let store = MemoryStore::new();
        let ana = store.insert_user(new_user("ana@x.org")).await.unwrap();

        let dup = store.insert_user(new_user("ANA@x.org")).await;
        assert!(matches!(dup, Err(AppError::EmailAlreadyExists)));

        assert!(store.soft_delete_user(ana.id, Utc::now()).await.unwrap());
        assert!(store.insert_user(new_user("ana@x.org")).await.is_ok());
        assert!(store.find_user(ana.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict_and_writes_nothing() {
        let store = MemoryStore::new();
        let delivery = store.insert_delivery(new_delivery()).await.unwrap();

        let mut edited = delivery.clone();
        edited.notes = "nova".into();
        let changes = ChangeSet {
            changed_by: 1,
            changed_at: Utc::now() + Duration::seconds(1),
            read_version: delivery.updated_at - Duration::seconds(5),
            changes: vec![FieldChange {
                field_name: "notes",
                old_value: String::new(),
                new_value: "nova".into(),
            }],
        };

        let result = store.update_delivery(&edited, &changes).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(store.delivery_logs(delivery.id).await.unwrap().is_empty());
        assert_eq!(store.find_delivery(delivery.id).await.unwrap().unwrap().notes, "");
    }

    #[tokio::test]
    async fn deleting_a_delivery_detaches_its_orders() {
        let store = MemoryStore::new();
        let delivery = store.insert_delivery(new_delivery()).await.unwrap();
        let order = store
            .insert_order(NewOrder {
                delivery_id: Some(delivery.id),
                item: "Arroz".into(),
                quantity: 1,
                unit: "kg".into(),
                unit_cost: Default::default(),
                packed_at: None,
                purchased_at: None,
                vendor_id: None,
                is_internal: false,
                status: Default::default(),
                notes: String::new(),
            })
            .await
            .unwrap();

        assert!(store.delete_delivery(delivery.id).await.unwrap());
        let order = store.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(order.delivery_id, None);
    }

    #[tokio::test]
    async fn refresh_tokens_are_single_use() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_refresh_token(1, "abc", now + Duration::days(1)).await.unwrap();

        assert!(store.take_refresh_token("abc", now).await.unwrap().is_some());
        assert!(store.take_refresh_token("abc", now).await.unwrap().is_none());

        store.insert_refresh_token(1, "old", now - Duration::seconds(1)).await.unwrap();
        assert!(store.take_refresh_token("old", now).await.unwrap().is_none());
    }
}
