// src/models/vendor.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::serde_utils::double_option;
use crate::models::auth::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VendorCategory {
    Produce,
    ShelfStable,
    Packaging,
}

impl VendorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VendorCategory::Produce => "produce",
            VendorCategory::ShelfStable => "shelf_stable",
            VendorCategory::Packaging => "packaging",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "produce" => Some(VendorCategory::Produce),
            "shelf_stable" => Some(VendorCategory::ShelfStable),
            "packaging" => Some(VendorCategory::Packaging),
            _ => None,
        }
    }
}

impl fmt::Display for VendorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Coluna TEXT com CHECK no banco
impl TryFrom<String> for VendorCategory {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("categoria de fornecedor desconhecida: {value}"))
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: i64,
    #[schema(example = "Hortifruti Vale Verde")]
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[sqlx(try_from = "String")]
    pub category: VendorCategory,
    pub contact_id: Option<i64>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<User>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVendor {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: VendorCategory,
    pub contact_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVendorPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude fora do intervalo."))]
    #[serde(default)]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude fora do intervalo."))]
    #[serde(default)]
    pub longitude: f64,
    pub category: VendorCategory,
    pub contact_id: Option<i64>,
}

impl From<CreateVendorPayload> for NewVendor {
    fn from(p: CreateVendorPayload) -> Self {
        Self {
            name: p.name,
            address: p.address,
            latitude: p.latitude,
            longitude: p.longitude,
            category: p.category,
            contact_id: p.contact_id,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVendorPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude fora do intervalo."))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude fora do intervalo."))]
    pub longitude: Option<f64>,
    pub category: Option<VendorCategory>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub contact_id: Option<Option<i64>>,
}

impl UpdateVendorPayload {
    pub fn apply(self, vendor: &mut Vendor) {
        if let Some(name) = self.name {
            vendor.name = name;
        }
        if let Some(address) = self.address {
            vendor.address = address;
        }
        if let Some(latitude) = self.latitude {
            vendor.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            vendor.longitude = longitude;
        }
        if let Some(category) = self.category {
            vendor.category = category;
        }
        if let Some(contact_id) = self.contact_id {
            vendor.contact_id = contact_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_text_mapping() {
        for cat in [VendorCategory::Produce, VendorCategory::ShelfStable, VendorCategory::Packaging] {
            assert_eq!(VendorCategory::try_from(cat.as_str().to_string()), Ok(cat));
        }
        assert!(VendorCategory::try_from("frozen".to_string()).is_err());
        assert_eq!(
            serde_json::to_value(VendorCategory::ShelfStable).unwrap(),
            "shelf_stable"
        );
    }
}
