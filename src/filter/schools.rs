// src/filter/schools.rs

use std::cmp::Ordering;

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use crate::common::db_utils::{contains_ci, like_pattern};
use crate::filter::{
    sort::SortField, Expand, ListQuery, PageRequest, Predicate, QueryOptions, SortOrder,
};
use crate::models::school::School;

pub type SchoolQuery = ListQuery<SchoolCondition, SchoolSort>;

#[derive(Debug, Clone, PartialEq)]
pub enum SchoolCondition {
    Search(String),
    HasContact(bool),
    ContactIs(i64),
    IdIn(Vec<i64>),
}

impl Predicate<School> for SchoolCondition {
    fn matches(&self, school: &School) -> bool {
        match self {
            SchoolCondition::Search(term) => {
                contains_ci(&school.name, term) || contains_ci(&school.address, term)
            }
            SchoolCondition::HasContact(wanted) => school.contact_id.is_some() == *wanted,
            SchoolCondition::ContactIs(user_id) => school.contact_id == Some(*user_id),
            SchoolCondition::IdIn(ids) => ids.contains(&school.id),
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            SchoolCondition::Search(term) => {
                let pattern = like_pattern(term);
                qb.push("s.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR s.address ILIKE ")
                    .push_bind(pattern);
            }
            SchoolCondition::HasContact(true) => {
                qb.push("s.contact_id IS NOT NULL");
            }
            SchoolCondition::HasContact(false) => {
                qb.push("s.contact_id IS NULL");
            }
            SchoolCondition::ContactIs(user_id) => {
                qb.push("s.contact_id = ").push_bind(*user_id);
            }
            SchoolCondition::IdIn(ids) => {
                qb.push("s.id = ANY(").push_bind(ids.clone()).push(")");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchoolSort {
    #[default]
    Id,
    Name,
    Address,
    CreatedAt,
}

impl SortField for SchoolSort {
    type Record = School;
    const ID_COLUMN: &'static str = "s.id";

    fn from_param(name: &str) -> Self {
        match name {
            "name" => SchoolSort::Name,
            "address" => SchoolSort::Address,
            "createdAt" => SchoolSort::CreatedAt,
            _ => SchoolSort::Id,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SchoolSort::Id => "s.id",
            SchoolSort::Name => "s.name",
            SchoolSort::Address => "s.address",
            SchoolSort::CreatedAt => "s.created_at",
        }
    }

    fn compare(&self, a: &School, b: &School) -> Ordering {
        match self {
            SchoolSort::Id => a.id.cmp(&b.id),
            SchoolSort::Name => a.name.cmp(&b.name),
            SchoolSort::Address => a.address.cmp(&b.address),
            SchoolSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }

    fn id_of(school: &School) -> i64 {
        school.id
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SchoolFilterParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default, alias = "expand[]")]
    pub expand: Vec<String>,

    pub search: Option<String>,
    pub has_contact: Option<bool>,
    pub contact_user_id: Option<i64>,
}

impl SchoolFilterParams {
    /// `visible` é o recorte de acesso: `None` para admin, os IDs do chamador caso contrário.
    pub fn into_query(self, options: &QueryOptions, visible: Option<Vec<i64>>) -> (SchoolQuery, Expand) {
        let page = PageRequest::new(self.page, self.page_size, options.max_page_size);
        let mut query = SchoolQuery::new(page).sorted(
            SchoolSort::parse(self.sort_by.as_deref()),
            SortOrder::from_param(self.sort_order.as_deref()),
        );

        if let Some(ids) = visible {
            query = query.scoped(SchoolCondition::IdIn(ids));
        }
        if let Some(term) = self.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(SchoolCondition::Search(term.trim().to_string()));
        }
        if let Some(has_contact) = self.has_contact {
            query = query.filter(SchoolCondition::HasContact(has_contact));
        }
        if let Some(user_id) = self.contact_user_id {
            query = query.filter(SchoolCondition::ContactIs(user_id));
        }

        (query, Expand::new(self.expand))
    }
}
