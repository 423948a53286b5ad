// src/filter.rs
//
// Motor de listagem: filtros, ordenação e paginação.
// Cada condição sabe se avaliar em memória e se renderizar em SQL parametrizado,
// então o Postgres e o store em memória devolvem exatamente as mesmas linhas.

pub mod date;
pub mod deliveries;
pub mod expand;
pub mod page;
pub mod schools;
pub mod sort;
pub mod users;
pub mod vendors;

use sqlx::{Postgres, QueryBuilder};

pub use date::DateBoundary;
pub use expand::{Expand, ExpandParams};
pub use page::{PageRequest, PaginatedResponse, PaginationMeta, QueryResult};
pub use sort::{SortField, SortOrder};

/// Uma condição do WHERE.
pub trait Predicate<R> {
    fn matches(&self, record: &R) -> bool;
    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>);
}

/// Opções globais de listagem, vindas da configuração.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub max_page_size: i64,
    pub scheduled_to_boundary: DateBoundary,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            scheduled_to_boundary: DateBoundary::default(),
        }
    }
}

/// Consulta de listagem pronta para o store.
///
/// `scope` é o recorte de acesso (e.g. usuários ativos, escolas do chamador) e vale
/// também para `totalUnfiltered`; `filters` são os filtros pedidos pelo cliente.
#[derive(Debug, Clone)]
pub struct ListQuery<C, S> {
    pub scope: Vec<C>,
    pub filters: Vec<C>,
    pub sort: S,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl<C, S: SortField> ListQuery<C, S> {
    pub fn new(page: PageRequest) -> Self {
        Self {
            scope: Vec::new(),
            filters: Vec::new(),
            sort: S::default(),
            order: SortOrder::default(),
            page,
        }
    }

    pub fn scoped(mut self, condition: C) -> Self {
        self.scope.push(condition);
        self
    }

    pub fn filter(mut self, condition: C) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn sorted(mut self, sort: S, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }
}

// ---
// Renderização SQL
// ---

fn push_where<'a, R, C, I>(qb: &mut QueryBuilder<'_, Postgres>, conditions: I)
where
    C: Predicate<R> + 'a,
    I: IntoIterator<Item = &'a C>,
{
    for (i, condition) in conditions.into_iter().enumerate() {
        qb.push(if i == 0 { " WHERE (" } else { " AND (" });
        condition.push_sql(qb);
        qb.push(")");
    }
}

/// `SELECT COUNT(*) FROM ...` com escopo e, se `with_filters`, os filtros do cliente.
pub fn count_query<'args, R, C, S>(
    from: &str,
    query: &ListQuery<C, S>,
    with_filters: bool,
) -> QueryBuilder<'args, Postgres>
where
    C: Predicate<R>,
    S: SortField<Record = R>,
{
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {from}"));
    let filters: &[C] = if with_filters { &query.filters } else { &[] };
    push_where::<R, C, _>(&mut qb, query.scope.iter().chain(filters));
    qb
}

/// `SELECT ... FROM ... WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
pub fn select_query<'args, R, C, S>(
    select: &str,
    from: &str,
    query: &ListQuery<C, S>,
) -> QueryBuilder<'args, Postgres>
where
    C: Predicate<R>,
    S: SortField<Record = R>,
{
    let mut qb = QueryBuilder::new(format!("SELECT {select} FROM {from}"));
    push_where::<R, C, _>(&mut qb, query.scope.iter().chain(query.filters.iter()));
    sort::push_order_by(&mut qb, query.sort, query.order);
    qb.push(" LIMIT ")
        .push_bind(query.page.limit())
        .push(" OFFSET ")
        .push_bind(query.page.offset());
    qb
}

// ---
// Execução em memória
// ---

/// Mesma semântica do SQL, sobre registros já carregados.
pub fn apply_in_memory<R, C, S>(records: Vec<R>, query: &ListQuery<C, S>) -> QueryResult<R>
where
    C: Predicate<R>,
    S: SortField<Record = R>,
{
    let scoped: Vec<R> = records
        .into_iter()
        .filter(|r| query.scope.iter().all(|c| c.matches(r)))
        .collect();
    let total_unfiltered = scoped.len() as i64;

    let mut rows: Vec<R> = scoped
        .into_iter()
        .filter(|r| query.filters.iter().all(|c| c.matches(r)))
        .collect();
    let total = rows.len() as i64;

    sort::sort_records(&mut rows, query.sort, query.order);

    QueryResult {
        rows: query.page.slice(rows),
        total,
        total_unfiltered,
    }
}

// Mantém a ordem de entrada e descarta valores vazios
pub(crate) fn non_empty(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
