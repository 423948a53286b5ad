// src/filter/page.rs

use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Página já normalizada: `page >= 1` e `1 <= page_size <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: Option<i64>, max_page_size: i64) -> Self {
        let page = page.unwrap_or(DEFAULT_PAGE).max(1);
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, max_page_size.max(1));
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Recorta uma lista já filtrada e ordenada (usado pelo store em memória).
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        rows.into_iter().skip(offset).take(limit).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: i64,
    pub total_unfiltered: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: PageRequest, total: i64, total_unfiltered: i64) -> Self {
        // ceil(total / page_size)
        let total_pages = (total + page.page_size - 1) / page.page_size;
        Self {
            total,
            total_unfiltered,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        }
    }
}

// Envelope padrão das listagens
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

/// Resultado cru de uma consulta paginada, antes de virar resposta.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub rows: Vec<T>,
    pub total: i64,
    pub total_unfiltered: i64,
}

impl<T> QueryResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryResult<U> {
        QueryResult {
            rows: self.rows.into_iter().map(f).collect(),
            total: self.total,
            total_unfiltered: self.total_unfiltered,
        }
    }

    pub fn into_response(self, page: PageRequest) -> PaginatedResponse<T> {
        PaginatedResponse {
            meta: PaginationMeta::new(page, self.total, self.total_unfiltered),
            data: self.rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let page = PageRequest::new(None, None, 100);
        assert_eq!(page, PageRequest { page: 1, page_size: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn non_positive_values_are_clamped() {
        let page = PageRequest::new(Some(-3), Some(0), 100);
        assert_eq!(page, PageRequest { page: 1, page_size: 1 });
        assert!(page.offset() >= 0);
    }

    #[test]
    fn page_size_is_capped() {
        let page = PageRequest::new(Some(2), Some(5_000), 100);
        assert_eq!(page.page_size, 100);
        assert_eq!(page.offset(), 100);
    }

    #[test]
    fn total_pages_is_ceiling() {
        let page = PageRequest::new(Some(1), Some(10), 100);
        assert_eq!(PaginationMeta::new(page, 0, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(page, 10, 10).total_pages, 1);
        assert_eq!(PaginationMeta::new(page, 11, 20).total_pages, 2);
    }

    #[test]
    fn slice_walks_pages_without_overlap() {
        let rows: Vec<i32> = (1..=23).collect();
        let mut seen = Vec::new();
        for p in 1..=3 {
            seen.extend(PageRequest::new(Some(p), Some(10), 100).slice(rows.clone()));
        }
        assert_eq!(seen, rows);
        assert!(PageRequest::new(Some(4), Some(10), 100).slice(rows).is_empty());
    }
}
