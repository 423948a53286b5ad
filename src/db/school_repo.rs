// src/db/school_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    db::query::fetch_page,
    filter::{schools::SchoolQuery, QueryResult},
    models::school::{NewSchool, School},
};

const SCHOOL_COLUMNS: &str =
    "s.id, s.name, s.address, s.latitude, s.longitude, s.contact_id, s.created_at, s.updated_at";

#[derive(Clone)]
pub struct SchoolRepository {
    pool: PgPool,
}

impl SchoolRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<School>, AppError> {
        let school = sqlx::query_as::<_, School>(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(school)
    }

    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<School>, AppError> {
        let schools = sqlx::query_as::<_, School>(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools s WHERE s.id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(schools)
    }

    pub async fn query(&self, query: &SchoolQuery) -> Result<QueryResult<School>, AppError> {
        fetch_page(&self.pool, SCHOOL_COLUMNS, "schools s", query).await
    }

    pub async fn create<'e, E>(&self, executor: E, school: &NewSchool) -> Result<School, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let school = sqlx::query_as::<_, School>(
            r#"
            INSERT INTO schools (name, address, latitude, longitude, contact_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, address, latitude, longitude, contact_id, created_at, updated_at
            "#,
        )
        .bind(&school.name)
        .bind(&school.address)
        .bind(school.latitude)
        .bind(school.longitude)
        .bind(school.contact_id)
        .fetch_one(executor)
        .await?;
        Ok(school)
    }

    pub async fn update<'e, E>(&self, executor: E, school: &School) -> Result<School, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, School>(
            r#"
            UPDATE schools
            SET name = $2, address = $3, latitude = $4, longitude = $5, contact_id = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, address, latitude, longitude, contact_id, created_at, updated_at
            "#,
        )
        .bind(school.id)
        .bind(&school.name)
        .bind(&school.address)
        .bind(school.latitude)
        .bind(school.longitude)
        .bind(school.contact_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound)
    }

    // Entregas da escola ficam com school_id = NULL (FK ON DELETE SET NULL)
    pub async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM schools WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
