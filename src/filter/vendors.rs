// src/filter/vendors.rs

use std::cmp::Ordering;

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use crate::common::db_utils::{contains_ci, like_pattern};
use crate::filter::{
    sort::SortField, Expand, ListQuery, PageRequest, Predicate, QueryOptions, SortOrder,
};
use crate::models::vendor::{Vendor, VendorCategory};

pub type VendorQuery = ListQuery<VendorCondition, VendorSort>;

#[derive(Debug, Clone, PartialEq)]
pub enum VendorCondition {
    Search(String),
    CategoryIn(Vec<VendorCategory>),
    IdIn(Vec<i64>),
}

impl Predicate<Vendor> for VendorCondition {
    fn matches(&self, vendor: &Vendor) -> bool {
        match self {
            VendorCondition::Search(term) => {
                contains_ci(&vendor.name, term) || contains_ci(&vendor.address, term)
            }
            VendorCondition::CategoryIn(categories) => categories.contains(&vendor.category),
            VendorCondition::IdIn(ids) => ids.contains(&vendor.id),
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            VendorCondition::Search(term) => {
                let pattern = like_pattern(term);
                qb.push("v.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR v.address ILIKE ")
                    .push_bind(pattern);
            }
            VendorCondition::CategoryIn(categories) => {
                let values: Vec<String> = categories.iter().map(|c| c.as_str().to_string()).collect();
                qb.push("v.category = ANY(").push_bind(values).push(")");
            }
            VendorCondition::IdIn(ids) => {
                qb.push("v.id = ANY(").push_bind(ids.clone()).push(")");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VendorSort {
    #[default]
    Id,
    Name,
    Category,
    CreatedAt,
}

impl SortField for VendorSort {
    type Record = Vendor;
    const ID_COLUMN: &'static str = "v.id";

    fn from_param(name: &str) -> Self {
        match name {
            "name" => VendorSort::Name,
            "category" | "type" => VendorSort::Category,
            "createdAt" => VendorSort::CreatedAt,
            _ => VendorSort::Id,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            VendorSort::Id => "v.id",
            VendorSort::Name => "v.name",
            VendorSort::Category => "v.category",
            VendorSort::CreatedAt => "v.created_at",
        }
    }

    fn compare(&self, a: &Vendor, b: &Vendor) -> Ordering {
        match self {
            VendorSort::Id => a.id.cmp(&b.id),
            VendorSort::Name => a.name.cmp(&b.name),
            VendorSort::Category => a.category.as_str().cmp(b.category.as_str()),
            VendorSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }

    fn id_of(vendor: &Vendor) -> i64 {
        vendor.id
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VendorFilterParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default, alias = "expand[]")]
    pub expand: Vec<String>,

    pub search: Option<String>,
    /// Categorias (`produce`, `shelf_stable`, `packaging`); valores desconhecidos são ignorados
    #[serde(default, alias = "types[]")]
    pub types: Vec<String>,
}

impl VendorFilterParams {
    pub fn into_query(self, options: &QueryOptions, visible: Option<Vec<i64>>) -> (VendorQuery, Expand) {
        let page = PageRequest::new(self.page, self.page_size, options.max_page_size);
        let mut query = VendorQuery::new(page).sorted(
            VendorSort::parse(self.sort_by.as_deref()),
            SortOrder::from_param(self.sort_order.as_deref()),
        );

        if let Some(ids) = visible {
            query = query.scoped(VendorCondition::IdIn(ids));
        }
        if let Some(term) = self.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(VendorCondition::Search(term.trim().to_string()));
        }

        let categories: Vec<VendorCategory> = self
            .types
            .iter()
            .filter_map(|raw| VendorCategory::parse(raw))
            .collect();
        if !categories.is_empty() {
            query = query.filter(VendorCondition::CategoryIn(categories));
        }

        (query, Expand::new(self.expand))
    }
}
