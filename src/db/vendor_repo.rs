// src/db/vendor_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::query::fetch_page,
    filter::{vendors::VendorQuery, QueryResult},
    models::vendor::{NewVendor, Vendor},
};

const VENDOR_COLUMNS: &str = "v.id, v.name, v.address, v.latitude, v.longitude, v.category, \
                              v.contact_id, v.created_at, v.updated_at";

const RETURNING: &str =
    "RETURNING id, name, address, latitude, longitude, category, contact_id, created_at, updated_at";

#[derive(Clone)]
pub struct VendorRepository {
    pool: PgPool,
}

impl VendorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Vendor>, AppError> {
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors v WHERE v.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vendor)
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Vendor>, AppError> {
        let vendors = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors v WHERE v.id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(vendors)
    }

    pub async fn query(&self, query: &VendorQuery) -> Result<QueryResult<Vendor>, AppError> {
        fetch_page(&self.pool, VENDOR_COLUMNS, "vendors v", query).await
    }

    pub async fn create<'e, E>(&self, executor: E, vendor: &NewVendor) -> Result<Vendor, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            "INSERT INTO vendors (name, address, latitude, longitude, category, contact_id) \
             VALUES ($1, $2, $3, $4, $5, $6) {RETURNING}"
        ))
        .bind(&vendor.name)
        .bind(&vendor.address)
        .bind(vendor.latitude)
        .bind(vendor.longitude)
        .bind(vendor.category.as_str())
        .bind(vendor.contact_id)
        .fetch_one(executor)
        .await?;
        Ok(vendor)
    }

    pub async fn update<'e, E>(&self, executor: E, vendor: &Vendor) -> Result<Vendor, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Vendor>(&format!(
            "UPDATE vendors \
             SET name = $2, address = $3, latitude = $4, longitude = $5, category = $6, \
                 contact_id = $7, updated_at = NOW() \
             WHERE id = $1 {RETURNING}"
        ))
        .bind(vendor.id)
        .bind(&vendor.name)
        .bind(&vendor.address)
        .bind(vendor.latitude)
        .bind(vendor.longitude)
        .bind(vendor.category.as_str())
        .bind(vendor.contact_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound)
    }

    // Pedidos do fornecedor ficam com vendor_id = NULL (FK ON DELETE SET NULL)
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM vendors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
