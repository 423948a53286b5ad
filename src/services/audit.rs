// src/services/audit.rs
//
// Diff campo a campo para a trilha de auditoria.
// Cada entidade declara uma tabela estática de campos rastreados (nome + renderização);
// só gera linha o campo cujo texto antigo difere do novo.
// Campos sensíveis são gravados normalmente e apagados na leitura.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::models::{
    change_log::{ChangeLogEntry, FieldChange},
    delivery::{Delivery, Order},
};

pub struct TrackedField<T> {
    pub name: &'static str,
    pub render: fn(&T) -> String,
    // Nunca sai em resposta externa
    pub sensitive: bool,
}

const fn tracked<T>(name: &'static str, render: fn(&T) -> String) -> TrackedField<T> {
    TrackedField { name, render, sensitive: false }
}

const fn sensitive<T>(name: &'static str, render: fn(&T) -> String) -> TrackedField<T> {
    TrackedField { name, render, sensitive: true }
}

// --- Renderização ---
// Ausente vira string vazia; datas em RFC 3339 (segundos, UTC)

fn render_time(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn render_id(value: Option<i64>) -> String {
    value.map(|id| id.to_string()).unwrap_or_default()
}

// "10.50" e "10.5" são o mesmo valor
fn render_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

// ---
// Entregas
// ---
pub const DELIVERY_FIELDS: &[TrackedField<Delivery>] = &[
    tracked("contract", |d| d.contract.clone()),
    tracked("packageType", |d| d.package_type.clone()),
    tracked("notes", |d| d.notes.clone()),
    tracked("scheduledAt", |d| render_time(d.scheduled_at)),
    tracked("schoolId", |d| render_id(d.school_id)),
];

// ---
// Pedidos
// ---
pub const ORDER_FIELDS: &[TrackedField<Order>] = &[
    tracked("status", |o| o.status.as_str().to_string()),
    tracked("quantity", |o| o.quantity.to_string()),
    tracked("item", |o| o.item.clone()),
    sensitive("unitCost", |o| render_decimal(o.unit_cost)),
    tracked("notes", |o| o.notes.clone()),
    tracked("isInternal", |o| o.is_internal.to_string()),
    tracked("vendorId", |o| render_id(o.vendor_id)),
];

/// Compara `old` e `new` pelos campos da tabela e devolve uma mudança por campo alterado.
pub fn diff<T>(fields: &[TrackedField<T>], old: &T, new: &T) -> Vec<FieldChange> {
    fields
        .iter()
        .filter_map(|field| {
            let old_value = (field.render)(old);
            let new_value = (field.render)(new);
            (old_value != new_value).then_some(FieldChange {
                field_name: field.name,
                old_value,
                new_value,
            })
        })
        .collect()
}

/// Apaga `oldValue`/`newValue` das linhas de campos sensíveis; o nome do campo continua visível.
pub fn redact<T>(fields: &[TrackedField<T>], mut entries: Vec<ChangeLogEntry>) -> Vec<ChangeLogEntry> {
    for entry in &mut entries {
        let hidden = fields
            .iter()
            .any(|field| field.sensitive && field.name == entry.field_name);
        if hidden {
            entry.old_value.clear();
            entry.new_value.clear();
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::delivery::OrderStatus;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn order() -> Order {
        Order {
            id: 1,
            delivery_id: Some(1),
            item: "Arroz".into(),
            quantity: 5,
            unit: "kg".into(),
            unit_cost: Decimal::from_str("10.50").unwrap(),
            packed_at: None,
            purchased_at: None,
            vendor_id: Some(9),
            is_internal: false,
            status: OrderStatus::Pending,
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            vendor: None,
        }
    }

    fn delivery() -> Delivery {
        Delivery {
            id: 1,
            contract: "active".into(),
            package_type: "box".into(),
            scheduled_at: None,
            notes: String::new(),
            school_id: Some(5),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            status: None,
            school: None,
            orders: None,
        }
    }

    #[test]
    fn quantity_change_produces_one_row() {
        let old = order();
        let mut new = old.clone();
        new.quantity = 7;

        let changes = diff(ORDER_FIELDS, &old, &new);
        assert_eq!(
            changes,
            vec![FieldChange {
                field_name: "quantity",
                old_value: "5".into(),
                new_value: "7".into(),
            }]
        );
    }

    #[test]
    fn identical_payload_produces_nothing() {
        let old = order();
        assert!(diff(ORDER_FIELDS, &old, &old.clone()).is_empty());
    }

    #[test]
    fn untracked_fields_are_silent() {
        let old = order();
        let mut new = old.clone();
        new.unit = "saco".into();
        new.packed_at = Some(Utc::now());

        assert!(diff(ORDER_FIELDS, &old, &new).is_empty());
    }

    #[test]
    fn equal_decimals_with_different_scale_are_not_a_change() {
        let old = order();
        let mut new = old.clone();
        new.unit_cost = Decimal::from_str("10.5").unwrap();

        assert!(diff(ORDER_FIELDS, &old, &new).is_empty());
    }

    #[test]
    fn absent_values_render_as_empty_string() {
        let old = delivery();
        let mut new = old.clone();
        new.school_id = None;
        new.scheduled_at = Some(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());

        let changes = diff(DELIVERY_FIELDS, &old, &new);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field_name, "scheduledAt");
        assert_eq!(changes[0].old_value, "");
        assert_eq!(changes[0].new_value, "2024-03-10T12:00:00Z");
        assert_eq!(changes[1].field_name, "schoolId");
        assert_eq!(changes[1].old_value, "5");
        assert_eq!(changes[1].new_value, "");
    }

    #[test]
    fn unit_cost_is_recorded_but_blanked_on_read() {
        let old = order();
        let mut new = old.clone();
        new.unit_cost = Decimal::from_str("99.75").unwrap();
        new.quantity = 7;

        let changes = diff(ORDER_FIELDS, &old, &new);
        assert!(changes.iter().any(|c| c.field_name == "unitCost" && c.new_value == "99.75"));

        let entries: Vec<ChangeLogEntry> = changes
            .into_iter()
            .enumerate()
            .map(|(i, change)| ChangeLogEntry {
                id: i as i64 + 1,
                entity_id: 1,
                changed_by: 1,
                changed_by_name: None,
                changed_at: Utc::now(),
                field_name: change.field_name.to_string(),
                old_value: change.old_value,
                new_value: change.new_value,
            })
            .collect();

        let read = redact(ORDER_FIELDS, entries);
        let cost = read.iter().find(|e| e.field_name == "unitCost").unwrap();
        assert_eq!((cost.old_value.as_str(), cost.new_value.as_str()), ("", ""));
        let quantity = read.iter().find(|e| e.field_name == "quantity").unwrap();
        assert_eq!(quantity.new_value, "7");
    }
}
