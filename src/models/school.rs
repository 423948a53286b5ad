// src/models/school.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::common::serde_utils::double_option;
use crate::models::auth::User;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct School {
    pub id: i64,
    #[schema(example = "EMEF Monteiro Lobato")]
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_id: Option<i64>,

    // expand=contact
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<User>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSchoolPayload {
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
    pub contact_id: Option<i64>,
}

impl From<CreateSchoolPayload> for NewSchool {
    fn from(p: CreateSchoolPayload) -> Self {
        Self {
            name: p.name,
            address: p.address,
            latitude: p.latitude,
            longitude: p.longitude,
            contact_id: p.contact_id,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSchoolPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude fora do intervalo."))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude fora do intervalo."))]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub contact_id: Option<Option<i64>>,
}

impl UpdateSchoolPayload {
    pub fn apply(self, school: &mut School) {
        if let Some(name) = self.name {
            school.name = name;
        }
        if let Some(address) = self.address {
            school.address = address;
        }
        if let Some(latitude) = self.latitude {
            school.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            school.longitude = longitude;
        }
        if let Some(contact_id) = self.contact_id {
            school.contact_id = contact_id;
        }
    }
}
