// src/models/delivery.rs

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::common::serde_utils::double_option;
use crate::models::{school::School, vendor::Vendor};

// Contrato em espera: fora de qualquer filtro por status
pub const CONTRACT_HOLD: &str = "hold";

// --- 1. Status de Pedido ---
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    // Ordem de precedência do status derivado da entrega
    pub const PRECEDENCE: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Status derivado de uma entrega a partir dos status dos seus pedidos.
    ///
    /// `pending` vence tudo, depois `confirmed`, `completed` e `cancelled`.
    /// Sem pedidos não há status derivado.
    pub fn derive<'a, I>(statuses: I) -> Option<OrderStatus>
    where
        I: IntoIterator<Item = &'a OrderStatus>,
    {
        let present: Vec<OrderStatus> = statuses.into_iter().copied().collect();
        Self::PRECEDENCE
            .into_iter()
            .find(|candidate| present.contains(candidate))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("status de pedido desconhecido: {value}"))
    }
}

// --- 2. Entrega ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: i64,
    #[schema(example = "active")]
    pub contract: String,
    #[schema(example = "box")]
    pub package_type: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub school_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Calculado dos pedidos na leitura, não é coluna
    #[sqlx(skip)]
    pub status: Option<OrderStatus>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<School>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
}

impl Delivery {
    pub fn is_on_hold(&self) -> bool {
        self.contract == CONTRACT_HOLD
    }
}

#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub contract: String,
    pub package_type: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub school_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeliveryPayload {
    #[serde(default)]
    pub contract: String,
    #[serde(default)]
    pub package_type: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    pub school_id: Option<i64>,
}

impl From<CreateDeliveryPayload> for NewDelivery {
    fn from(p: CreateDeliveryPayload) -> Self {
        Self {
            contract: p.contract,
            package_type: p.package_type,
            scheduled_at: p.scheduled_at,
            notes: p.notes,
            school_id: p.school_id,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeliveryPayload {
    pub contract: Option<String>,
    pub package_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub school_id: Option<Option<i64>>,
    // Versão que o cliente editou; divergência vira 409
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateDeliveryPayload {
    pub fn apply(self, delivery: &mut Delivery) {
        if let Some(contract) = self.contract {
            delivery.contract = contract;
        }
        if let Some(package_type) = self.package_type {
            delivery.package_type = package_type;
        }
        if let Some(scheduled_at) = self.scheduled_at {
            delivery.scheduled_at = scheduled_at;
        }
        if let Some(notes) = self.notes {
            delivery.notes = notes;
        }
        if let Some(school_id) = self.school_id {
            delivery.school_id = school_id;
        }
    }
}

// --- 3. Pedido ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub delivery_id: Option<i64>,
    #[schema(example = "Arroz tipo 1")]
    pub item: String,
    pub quantity: i32,
    #[schema(example = "kg")]
    pub unit: String,

    // Custo interno: nunca sai na resposta
    #[serde(skip_serializing)]
    pub unit_cost: Decimal,

    pub packed_at: Option<DateTime<Utc>>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub vendor_id: Option<i64>,
    pub is_internal: bool,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // expand=orders.vendor
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub delivery_id: Option<i64>,
    pub item: String,
    pub quantity: i32,
    pub unit: String,
    pub unit_cost: Decimal,
    pub packed_at: Option<DateTime<Utc>>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub vendor_id: Option<i64>,
    pub is_internal: bool,
    pub status: OrderStatus,
    pub notes: String,
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(length(min = 1, message = "O item é obrigatório."))]
    pub item: String,
    #[validate(range(min = 0, message = "A quantidade não pode ser negativa."))]
    pub quantity: i32,
    #[serde(default)]
    pub unit: String,
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    #[schema(value_type = f64)]
    pub unit_cost: Decimal,
    pub packed_at: Option<DateTime<Utc>>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub vendor_id: Option<i64>,
    #[serde(default)]
    pub is_internal: bool,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
}

impl CreateOrderPayload {
    pub fn into_new_order(self, delivery_id: Option<i64>) -> NewOrder {
        NewOrder {
            delivery_id,
            item: self.item,
            quantity: self.quantity,
            unit: self.unit,
            unit_cost: self.unit_cost,
            packed_at: self.packed_at,
            purchased_at: self.purchased_at,
            vendor_id: self.vendor_id,
            is_internal: self.is_internal,
            status: self.status,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderPayload {
    #[validate(length(min = 1, message = "O item é obrigatório."))]
    pub item: Option<String>,
    #[validate(range(min = 0, message = "A quantidade não pode ser negativa."))]
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(value_type = Option<f64>)]
    pub unit_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub packed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub purchased_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub vendor_id: Option<Option<i64>>,
    pub is_internal: Option<bool>,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateOrderPayload {
    pub fn apply(self, order: &mut Order) {
        if let Some(item) = self.item {
            order.item = item;
        }
        if let Some(quantity) = self.quantity {
            order.quantity = quantity;
        }
        if let Some(unit) = self.unit {
            order.unit = unit;
        }
        if let Some(unit_cost) = self.unit_cost {
            order.unit_cost = unit_cost;
        }
        if let Some(packed_at) = self.packed_at {
            order.packed_at = packed_at;
        }
        if let Some(purchased_at) = self.purchased_at {
            order.purchased_at = purchased_at;
        }
        if let Some(vendor_id) = self.vendor_id {
            order.vendor_id = vendor_id;
        }
        if let Some(is_internal) = self.is_internal {
            order.is_internal = is_internal;
        }
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(notes) = self.notes {
            order.notes = notes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn derived_status_follows_precedence() {
        assert_eq!(OrderStatus::derive(&[Cancelled, Completed, Pending]), Some(Pending));
        assert_eq!(OrderStatus::derive(&[Cancelled, Confirmed, Completed]), Some(Confirmed));
        assert_eq!(OrderStatus::derive(&[Cancelled, Completed]), Some(Completed));
        assert_eq!(OrderStatus::derive(&[Cancelled, Cancelled]), Some(Cancelled));
    }

    #[test]
    fn no_orders_means_no_derived_status() {
        let none: [OrderStatus; 0] = [];
        assert_eq!(OrderStatus::derive(&none), None);
    }

    #[test]
    fn status_text_mapping() {
        assert_eq!(OrderStatus::parse(" confirmed "), Some(Confirmed));
        assert_eq!(OrderStatus::parse("shipped"), None);
        assert_eq!(serde_json::to_value(Cancelled).unwrap(), "cancelled");
    }
}
