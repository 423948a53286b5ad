// src/db/query.rs

use sqlx::{postgres::PgRow, FromRow, PgPool};

use crate::{
    common::error::AppError,
    filter::{count_query, select_query, ListQuery, Predicate, QueryResult, SortField},
};

/// Executa uma listagem: total filtrado, total sem filtros (só escopo) e a página.
pub async fn fetch_page<R, T, C, S>(
    pool: &PgPool,
    select: &str,
    from: &str,
    query: &ListQuery<C, S>,
) -> Result<QueryResult<T>, AppError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    C: Predicate<R> + Sync,
    S: SortField<Record = R>,
{
    let total: i64 = count_query(from, query, true)
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let total_unfiltered: i64 = count_query(from, query, false)
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let rows = select_query(select, from, query)
        .build_query_as::<T>()
        .fetch_all(pool)
        .await?;

    Ok(QueryResult { rows, total, total_unfiltered })
}
