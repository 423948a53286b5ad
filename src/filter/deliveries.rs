// src/filter/deliveries.rs

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use crate::common::{
    db_utils::{contains_ci, like_pattern},
    error::AppError,
};
use crate::filter::{
    date::{DateParam, UpperBound},
    non_empty,
    sort::{cmp_nulls_last, SortField},
    Expand, ListQuery, PageRequest, Predicate, QueryOptions, SortOrder,
};
use crate::models::delivery::{Delivery, Order, OrderStatus, CONTRACT_HOLD};

pub type DeliveryQuery = ListQuery<DeliveryCondition, DeliverySort>;

/// Entrega com o que os filtros precisam enxergar: pedidos e nome da escola.
#[derive(Debug, Clone)]
pub struct DeliveryRow {
    pub delivery: Delivery,
    pub orders: Vec<Order>,
    pub school_name: Option<String>,
}

impl DeliveryRow {
    pub fn derived_status(&self) -> Option<OrderStatus> {
        OrderStatus::derive(self.orders.iter().map(|o| &o.status))
    }

    fn has_vendor_in(&self, vendors: &[i64]) -> bool {
        self.orders
            .iter()
            .any(|o| o.vendor_id.is_some_and(|v| vendors.contains(&v)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryCondition {
    // Texto em notes ou no nome da escola
    Search(String),
    ScheduledFrom(DateTime<Utc>),
    ScheduledTo(UpperBound),
    ContractIn(Vec<String>),
    SchoolIn(Vec<i64>),
    PackageTypeIn(Vec<String>),
    // Status derivado dos pedidos; contratos em `hold` nunca entram
    StatusIn(Vec<OrderStatus>),
    // Existe algum pedido de um desses fornecedores
    VendorIn(Vec<i64>),
    // Recorte de acesso: escola no escopo OU algum pedido de fornecedor no escopo
    VisibleTo { schools: Vec<i64>, vendors: Vec<i64> },
}

// CASE com a precedência do status derivado; NULL quando a entrega não tem pedidos
fn derived_status_sql() -> String {
    let mut sql = String::from("(SELECT CASE");
    for status in OrderStatus::PRECEDENCE {
        sql.push_str(&format!(
            " WHEN bool_or(o.status = '{0}') THEN '{0}'",
            status.as_str()
        ));
    }
    sql.push_str(" END FROM orders o WHERE o.delivery_id = d.id)");
    sql
}

fn push_vendor_exists(qb: &mut QueryBuilder<'_, Postgres>, vendors: &[i64]) {
    qb.push("EXISTS (SELECT 1 FROM orders o WHERE o.delivery_id = d.id AND o.vendor_id = ANY(")
        .push_bind(vendors.to_vec())
        .push("))");
}

impl Predicate<DeliveryRow> for DeliveryCondition {
    fn matches(&self, row: &DeliveryRow) -> bool {
        let d = &row.delivery;
        match self {
            DeliveryCondition::Search(term) => {
                contains_ci(&d.notes, term)
                    || row.school_name.as_deref().is_some_and(|name| contains_ci(name, term))
            }
            DeliveryCondition::ScheduledFrom(from) => d.scheduled_at.is_some_and(|at| at >= *from),
            DeliveryCondition::ScheduledTo(bound) => d.scheduled_at.is_some_and(|at| bound.admits(at)),
            DeliveryCondition::ContractIn(values) => values.contains(&d.contract),
            DeliveryCondition::SchoolIn(ids) => d.school_id.is_some_and(|id| ids.contains(&id)),
            DeliveryCondition::PackageTypeIn(values) => values.contains(&d.package_type),
            DeliveryCondition::StatusIn(statuses) => {
                !d.is_on_hold()
                    && row
                        .derived_status()
                        .is_some_and(|status| statuses.contains(&status))
            }
            DeliveryCondition::VendorIn(vendors) => row.has_vendor_in(vendors),
            DeliveryCondition::VisibleTo { schools, vendors } => {
                d.school_id.is_some_and(|id| schools.contains(&id)) || row.has_vendor_in(vendors)
            }
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            DeliveryCondition::Search(term) => {
                let pattern = like_pattern(term);
                qb.push("d.notes ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR sc.name ILIKE ")
                    .push_bind(pattern);
            }
            DeliveryCondition::ScheduledFrom(from) => {
                qb.push("d.scheduled_at >= ").push_bind(*from);
            }
            DeliveryCondition::ScheduledTo(bound) => {
                qb.push("d.scheduled_at")
                    .push(bound.sql_operator())
                    .push_bind(bound.at);
            }
            DeliveryCondition::ContractIn(values) => {
                qb.push("d.contract = ANY(").push_bind(values.clone()).push(")");
            }
            DeliveryCondition::SchoolIn(ids) => {
                qb.push("d.school_id = ANY(").push_bind(ids.clone()).push(")");
            }
            DeliveryCondition::PackageTypeIn(values) => {
                qb.push("d.package_type = ANY(").push_bind(values.clone()).push(")");
            }
            DeliveryCondition::StatusIn(statuses) => {
                let values: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
                qb.push("d.contract <> ")
                    .push_bind(CONTRACT_HOLD)
                    .push(" AND ")
                    .push(derived_status_sql())
                    .push(" = ANY(")
                    .push_bind(values)
                    .push(")");
            }
            DeliveryCondition::VendorIn(vendors) => push_vendor_exists(qb, vendors),
            DeliveryCondition::VisibleTo { schools, vendors } => match (schools.is_empty(), vendors.is_empty()) {
                (true, true) => {
                    qb.push("FALSE");
                }
                (false, true) => {
                    qb.push("d.school_id = ANY(").push_bind(schools.clone()).push(")");
                }
                (true, false) => push_vendor_exists(qb, vendors),
                (false, false) => {
                    qb.push("d.school_id = ANY(").push_bind(schools.clone()).push(") OR ");
                    push_vendor_exists(qb, vendors);
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliverySort {
    #[default]
    Id,
    ScheduledAt,
    PackageType,
    Notes,
    Contract,
    SchoolId,
    CreatedAt,
}

impl SortField for DeliverySort {
    type Record = DeliveryRow;
    const ID_COLUMN: &'static str = "d.id";

    fn from_param(name: &str) -> Self {
        match name {
            "scheduledAt" => DeliverySort::ScheduledAt,
            "packageType" => DeliverySort::PackageType,
            "notes" => DeliverySort::Notes,
            "contract" => DeliverySort::Contract,
            "schoolId" => DeliverySort::SchoolId,
            "createdAt" => DeliverySort::CreatedAt,
            _ => DeliverySort::Id,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            DeliverySort::Id => "d.id",
            DeliverySort::ScheduledAt => "d.scheduled_at",
            DeliverySort::PackageType => "d.package_type",
            DeliverySort::Notes => "d.notes",
            DeliverySort::Contract => "d.contract",
            DeliverySort::SchoolId => "d.school_id",
            DeliverySort::CreatedAt => "d.created_at",
        }
    }

    fn compare(&self, a: &DeliveryRow, b: &DeliveryRow) -> Ordering {
        let (a, b) = (&a.delivery, &b.delivery);
        match self {
            DeliverySort::Id => a.id.cmp(&b.id),
            DeliverySort::ScheduledAt => cmp_nulls_last(a.scheduled_at, b.scheduled_at),
            DeliverySort::PackageType => a.package_type.cmp(&b.package_type),
            DeliverySort::Notes => a.notes.cmp(&b.notes),
            DeliverySort::Contract => a.contract.cmp(&b.contract),
            DeliverySort::SchoolId => cmp_nulls_last(a.school_id, b.school_id),
            DeliverySort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }

    fn id_of(row: &DeliveryRow) -> i64 {
        row.delivery.id
    }
}

/// Parâmetros de `GET /api/deliveries`. Listas aceitam chaves repetidas (`status=a&status=b`)
/// e o sufixo `[]`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeliveryFilterParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default, alias = "expand[]")]
    pub expand: Vec<String>,

    pub search: Option<String>,
    /// RFC 3339 ou AAAA-MM-DD
    pub scheduled_from: Option<String>,
    /// RFC 3339 ou AAAA-MM-DD
    pub scheduled_to: Option<String>,
    #[serde(default, alias = "contract[]")]
    pub contract: Vec<String>,
    #[serde(default, alias = "schoolId[]")]
    pub school_id: Vec<i64>,
    #[serde(default, alias = "vendorId[]")]
    pub vendor_id: Vec<i64>,
    #[serde(default, alias = "packageType[]")]
    pub package_type: Vec<String>,
    #[serde(default, alias = "status[]")]
    pub status: Vec<String>,
}

impl DeliveryFilterParams {
    /// `scope` é o recorte de acesso do chamador (`None` para admin).
    pub fn into_query(
        self,
        options: &QueryOptions,
        scope: Option<DeliveryCondition>,
    ) -> Result<(DeliveryQuery, Expand), AppError> {
        let page = PageRequest::new(self.page, self.page_size, options.max_page_size);
        let mut query = DeliveryQuery::new(page).sorted(
            DeliverySort::parse(self.sort_by.as_deref()),
            SortOrder::from_param(self.sort_order.as_deref()),
        );

        if let Some(scope) = scope {
            query = query.scoped(scope);
        }

        if let Some(term) = self.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(DeliveryCondition::Search(term.trim().to_string()));
        }
        if let Some(raw) = self.scheduled_from.filter(|s| !s.trim().is_empty()) {
            let from = DateParam::parse("scheduledFrom", &raw)?;
            query = query.filter(DeliveryCondition::ScheduledFrom(from.lower_bound()));
        }
        if let Some(raw) = self.scheduled_to.filter(|s| !s.trim().is_empty()) {
            let to = DateParam::parse("scheduledTo", &raw)?;
            query = query.filter(DeliveryCondition::ScheduledTo(
                to.upper_bound(options.scheduled_to_boundary),
            ));
        }

        let contracts = non_empty(self.contract);
        if !contracts.is_empty() {
            query = query.filter(DeliveryCondition::ContractIn(contracts));
        }
        if !self.school_id.is_empty() {
            query = query.filter(DeliveryCondition::SchoolIn(self.school_id));
        }
        let package_types = non_empty(self.package_type);
        if !package_types.is_empty() {
            query = query.filter(DeliveryCondition::PackageTypeIn(package_types));
        }

        // Status desconhecidos são ignorados; sem nenhum válido, não há filtro
        let mut statuses: Vec<OrderStatus> = Vec::new();
        for status in self.status.iter().filter_map(|raw| OrderStatus::parse(raw)) {
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        if !statuses.is_empty() {
            query = query.filter(DeliveryCondition::StatusIn(statuses));
        }

        if !self.vendor_id.is_empty() {
            query = query.filter(DeliveryCondition::VendorIn(self.vendor_id));
        }

        Ok((query, Expand::new(self.expand)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{apply_in_memory, count_query, select_query, DateBoundary};
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use OrderStatus::*;

    fn order(id: i64, delivery_id: i64, vendor_id: i64, status: OrderStatus) -> Order {
        Order {
            id,
            delivery_id: Some(delivery_id),
            item: "Feijão".into(),
            quantity: 1,
            unit: "kg".into(),
            unit_cost: Decimal::ZERO,
            packed_at: None,
            purchased_at: None,
            vendor_id: Some(vendor_id),
            is_internal: false,
            status,
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            vendor: None,
        }
    }

    fn row(id: i64, contract: &str, school_id: i64, orders: Vec<Order>) -> DeliveryRow {
        DeliveryRow {
            delivery: Delivery {
                id,
                contract: contract.into(),
                package_type: "box".into(),
                scheduled_at: Some(Utc.with_ymd_and_hms(2024, 5, id as u32 % 28 + 1, 10, 0, 0).unwrap()),
                notes: format!("entrega {id}"),
                school_id: Some(school_id),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                status: None,
                school: None,
                orders: None,
            },
            orders,
            school_name: Some(format!("Escola {school_id}")),
        }
    }

    fn status_query(statuses: &[&str]) -> DeliveryQuery {
        let params = DeliveryFilterParams {
            status: statuses.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        params.into_query(&QueryOptions::default(), None).unwrap().0
    }

    fn ids(rows: &[DeliveryRow]) -> Vec<i64> {
        rows.iter().map(|r| r.delivery.id).collect()
    }

    #[test]
    fn hold_is_excluded_from_every_status_filter() {
        let rows = vec![
            row(1, "hold", 1, vec![order(1, 1, 9, Pending)]),
            row(2, "active", 1, vec![order(2, 2, 9, Pending)]),
        ];

        for status in ["pending", "confirmed", "completed", "cancelled"] {
            let result = apply_in_memory(rows.clone(), &status_query(&[status]));
            assert!(!ids(&result.rows).contains(&1), "hold apareceu em {status}");
        }
    }

    #[test]
    fn deliveries_without_orders_never_match_status() {
        let rows = vec![row(1, "active", 1, vec![])];
        let result = apply_in_memory(rows, &status_query(&["pending", "confirmed", "completed", "cancelled"]));
        assert!(result.rows.is_empty());
    }

    #[test]
    fn status_uses_derived_precedence() {
        let rows = vec![
            row(1, "active", 1, vec![order(1, 1, 9, Confirmed), order(2, 1, 9, Pending)]),
            row(2, "active", 1, vec![order(3, 2, 9, Confirmed), order(4, 2, 9, Completed)]),
            row(3, "active", 1, vec![order(5, 3, 9, Cancelled), order(6, 3, 9, Completed)]),
        ];

        assert_eq!(ids(&apply_in_memory(rows.clone(), &status_query(&["confirmed"])).rows), vec![2]);
        assert_eq!(ids(&apply_in_memory(rows.clone(), &status_query(&["completed"])).rows), vec![3]);
        assert_eq!(ids(&apply_in_memory(rows, &status_query(&["pending", "completed"])).rows), vec![1, 3]);
    }

    #[test]
    fn unknown_statuses_are_ignored() {
        let query = status_query(&["shipped"]);
        assert!(query.filters.is_empty());
    }

    #[test]
    fn vendor_filter_has_existence_semantics() {
        let rows = vec![
            row(1, "active", 1, vec![order(1, 1, 12, Pending), order(2, 1, 4, Pending)]),
            row(2, "active", 2, vec![order(3, 2, 4, Pending)]),
        ];
        let params = DeliveryFilterParams { vendor_id: vec![12], ..Default::default() };
        let (query, _) = params.into_query(&QueryOptions::default(), None).unwrap();

        assert_eq!(ids(&apply_in_memory(rows, &query).rows), vec![1]);
    }

    #[test]
    fn multi_valued_filters_or_within_and_across() {
        let mut rows = vec![
            row(1, "active", 1, vec![]),
            row(2, "completed", 2, vec![]),
            row(3, "active", 3, vec![]),
        ];
        rows[1].delivery.package_type = "bag".into();
        let params = DeliveryFilterParams {
            contract: vec!["active".into(), "completed".into()],
            school_id: vec![1, 2],
            ..Default::default()
        };
        let (query, _) = params.into_query(&QueryOptions::default(), None).unwrap();

        assert_eq!(ids(&apply_in_memory(rows, &query).rows), vec![1, 2]);
    }

    #[test]
    fn pages_partition_the_filtered_set() {
        let rows: Vec<DeliveryRow> = (1..=27)
            .map(|id| row(id, if id % 5 == 0 { "hold" } else { "active" }, id % 3, vec![]))
            .collect();

        for page_size in [1, 4, 10, 27, 50] {
            let mut seen = Vec::new();
            let base = DeliveryFilterParams {
                contract: vec!["active".into()],
                sort_by: Some("scheduledAt".into()),
                sort_order: Some("desc".into()),
                page_size: Some(page_size),
                ..Default::default()
            };
            let (first, _) = base.into_query(&QueryOptions::default(), None).unwrap();
            let meta = apply_in_memory(rows.clone(), &first).into_response(first.page).meta;

            for page in 1..=meta.total_pages {
                let mut query = first.clone();
                query.page = PageRequest::new(Some(page), Some(page_size), 100);
                seen.extend(ids(&apply_in_memory(rows.clone(), &query).rows));
            }

            let mut unique = seen.clone();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(seen.len() as i64, meta.total, "page_size {page_size}");
            assert_eq!(unique.len(), seen.len(), "linha repetida com page_size {page_size}");
        }
    }

    #[test]
    fn visibility_scope_ors_school_and_vendor() {
        let rows = vec![
            row(1, "active", 5, vec![]),
            row(2, "active", 6, vec![order(1, 2, 12, Pending)]),
            row(3, "active", 7, vec![order(2, 3, 4, Pending)]),
        ];
        let scope = DeliveryCondition::VisibleTo { schools: vec![5], vendors: vec![12] };
        let (query, _) = DeliveryFilterParams::default()
            .into_query(&QueryOptions::default(), Some(scope))
            .unwrap();

        let result = apply_in_memory(rows, &query);
        assert_eq!(ids(&result.rows), vec![1, 2]);
        assert_eq!(result.total_unfiltered, 2);
    }

    #[test]
    fn invalid_date_is_rejected() {
        let params = DeliveryFilterParams { scheduled_from: Some("ontem".into()), ..Default::default() };
        let err = params.into_query(&QueryOptions::default(), None).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { .. }));
    }

    #[test]
    fn sql_is_parameterised() {
        let params = DeliveryFilterParams {
            search: Some("norte".into()),
            status: vec!["pending".into()],
            sort_by: Some("packageType; DROP TABLE deliveries".into()),
            ..Default::default()
        };
        let (query, _) = params.into_query(&QueryOptions::default(), None).unwrap();

        let from = "deliveries d LEFT JOIN schools sc ON sc.id = d.school_id";
        let select = select_query("d.*", from, &query);
        let sql = select.sql();

        assert!(sql.contains("(d.notes ILIKE $1 OR sc.name ILIKE $2)"));
        assert!(sql.contains("d.contract <> $3 AND (SELECT CASE WHEN bool_or(o.status = 'pending') THEN 'pending'"));
        assert!(sql.contains("= ANY($4)"));
        assert!(sql.ends_with("ORDER BY d.id ASC LIMIT $5 OFFSET $6"));
        assert!(!sql.contains("DROP"));

        let count = count_query("deliveries d LEFT JOIN schools sc ON sc.id = d.school_id", &query, false);
        assert_eq!(count.sql(), format!("SELECT COUNT(*) FROM {from}"));
    }

    #[test]
    fn scheduled_range_follows_the_configured_day_boundary() {
        let at = |day, hour| Some(Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap());
        let mut rows: Vec<DeliveryRow> = (1..=4).map(|id| row(id, "active", 1, vec![])).collect();
        rows[0].delivery.scheduled_at = at(10, 0);
        rows[1].delivery.scheduled_at = at(10, 9);
        rows[2].delivery.scheduled_at = at(11, 0);
        rows[3].delivery.scheduled_at = None;

        let until = |boundary| {
            let options = QueryOptions { scheduled_to_boundary: boundary, ..Default::default() };
            let params = DeliveryFilterParams { scheduled_to: Some("2024-03-10".into()), ..Default::default() };
            params.into_query(&options, None).unwrap().0
        };

        let start = until(DateBoundary::StartOfDay);
        assert_eq!(ids(&apply_in_memory(rows.clone(), &start).rows), vec![1]);
        assert!(select_query("d.*", "deliveries d", &start).sql().contains("d.scheduled_at <= $1"));

        let end = until(DateBoundary::EndOfDay);
        assert_eq!(ids(&apply_in_memory(rows.clone(), &end).rows), vec![1, 2]);
        assert!(select_query("d.*", "deliveries d", &end).sql().contains("d.scheduled_at < $1"));

        // Sem data agendada nunca entra num intervalo
        let params = DeliveryFilterParams { scheduled_from: Some("2024-03-10".into()), ..Default::default() };
        let (from, _) = params.into_query(&QueryOptions::default(), None).unwrap();
        assert_eq!(ids(&apply_in_memory(rows, &from).rows), vec![1, 2, 3]);
        assert!(select_query("d.*", "deliveries d", &from).sql().contains("d.scheduled_at >= $1"));
    }
}
