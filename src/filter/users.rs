// src/filter/users.rs

use std::cmp::Ordering;

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use utoipa::IntoParams;

use crate::common::db_utils::{contains_ci, like_pattern};
use crate::filter::{
    sort::SortField, Expand, ListQuery, PageRequest, Predicate, QueryOptions, SortOrder,
};
use crate::models::{
    auth::User,
    roles::{RoleClaim, RoleName},
};

pub type UserQuery = ListQuery<UserCondition, UserSort>;

#[derive(Debug, Clone, PartialEq)]
pub enum UserCondition {
    // Escopo base: soft delete
    Active,
    Search(String),
    IdEq(i64),
    EmailEq(String),
    NameEq(String),
    // Papel com entidade opcional; sem entidade, qualquer escopo do papel serve
    HasRole { role: RoleName, entity_id: Option<i64> },
}

impl Predicate<User> for UserCondition {
    fn matches(&self, user: &User) -> bool {
        match self {
            UserCondition::Active => user.is_active(),
            UserCondition::Search(term) => {
                contains_ci(&user.name, term)
                    || contains_ci(&user.email, term)
                    || contains_ci(&user.phone, term)
            }
            UserCondition::IdEq(id) => user.id == *id,
            UserCondition::EmailEq(email) => user.email.to_lowercase() == email.to_lowercase(),
            UserCondition::NameEq(name) => &user.name == name,
            UserCondition::HasRole { role, entity_id } => user
                .role_set()
                .claims()
                .iter()
                .any(|claim| &claim.role == role && entity_id.is_none_or(|id| claim.entity_id == Some(id))),
        }
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            UserCondition::Active => {
                qb.push("u.deleted_at IS NULL");
            }
            UserCondition::Search(term) => {
                let pattern = like_pattern(term);
                qb.push("u.name ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR u.email ILIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR u.phone ILIKE ")
                    .push_bind(pattern);
            }
            UserCondition::IdEq(id) => {
                qb.push("u.id = ").push_bind(*id);
            }
            UserCondition::EmailEq(email) => {
                qb.push("lower(u.email) = lower(").push_bind(email.clone()).push(")");
            }
            UserCondition::NameEq(name) => {
                qb.push("u.name = ").push_bind(name.clone());
            }
            UserCondition::HasRole { role, entity_id } => {
                // Mesma regra do parser: divide em ',' e no primeiro ':'
                qb.push(
                    "EXISTS (SELECT 1 FROM unnest(string_to_array(u.roles, ',')) AS r(tok) \
                     WHERE btrim(split_part(btrim(r.tok), ':', 1)) = ",
                )
                .push_bind(role.as_str().to_string());
                if let Some(id) = entity_id {
                    // Só dígitos e dentro do bigint; CASE aninhado garante a ordem dos casts
                    qb.push(
                        " AND (CASE WHEN strpos(btrim(r.tok), ':') > 0 \
                         AND btrim(substr(btrim(r.tok), strpos(btrim(r.tok), ':') + 1)) ~ '^[0-9]+$' \
                         THEN CASE WHEN btrim(substr(btrim(r.tok), strpos(btrim(r.tok), ':') + 1))::numeric <= 9223372036854775807 \
                         THEN btrim(substr(btrim(r.tok), strpos(btrim(r.tok), ':') + 1))::bigint END END) = ",
                    )
                    .push_bind(*id);
                }
                qb.push(")");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserSort {
    #[default]
    Id,
    Name,
    Email,
    CreatedAt,
}

impl SortField for UserSort {
    type Record = User;
    const ID_COLUMN: &'static str = "u.id";

    fn from_param(name: &str) -> Self {
        match name {
            "name" => UserSort::Name,
            "email" => UserSort::Email,
            "createdAt" => UserSort::CreatedAt,
            _ => UserSort::Id,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            UserSort::Id => "u.id",
            UserSort::Name => "u.name",
            UserSort::Email => "u.email",
            UserSort::CreatedAt => "u.created_at",
        }
    }

    fn compare(&self, a: &User, b: &User) -> Ordering {
        match self {
            UserSort::Id => a.id.cmp(&b.id),
            UserSort::Name => a.name.cmp(&b.name),
            UserSort::Email => a.email.cmp(&b.email),
            UserSort::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }

    fn id_of(user: &User) -> i64 {
        user.id
    }
}

/// Parâmetros de `GET /api/users`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilterParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default, alias = "expand[]")]
    pub expand: Vec<String>,

    pub search: Option<String>,
    pub id: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
    /// Nome do papel (`admin`, `school_admin`, `vendor_admin`)
    pub role: Option<String>,
    /// Restringe `role` a uma entidade
    pub entity_id: Option<i64>,
    /// Papel exato no formato `papel[:id]`
    pub has_role: Option<String>,
}

impl UserFilterParams {
    pub fn into_query(self, options: &QueryOptions) -> (UserQuery, Expand) {
        let page = PageRequest::new(self.page, self.page_size, options.max_page_size);
        let sort = UserSort::parse(self.sort_by.as_deref());
        let order = SortOrder::from_param(self.sort_order.as_deref());

        let mut query = UserQuery::new(page)
            .scoped(UserCondition::Active)
            .sorted(sort, order);

        if let Some(term) = self.search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(UserCondition::Search(term.trim().to_string()));
        }
        if let Some(id) = self.id {
            query = query.filter(UserCondition::IdEq(id));
        }
        if let Some(email) = self.email.filter(|s| !s.trim().is_empty()) {
            query = query.filter(UserCondition::EmailEq(email.trim().to_string()));
        }
        if let Some(name) = self.name.filter(|s| !s.trim().is_empty()) {
            query = query.filter(UserCondition::NameEq(name.trim().to_string()));
        }
        if let Some(role) = self.role.filter(|s| !s.trim().is_empty()) {
            query = query.filter(UserCondition::HasRole {
                role: RoleName::parse(role.trim()),
                entity_id: self.entity_id,
            });
        }
        if let Some(raw) = self.has_role.filter(|s| !s.trim().is_empty()) {
            let RoleClaim { role, entity_id } = RoleClaim::parse(&raw);
            query = query.filter(UserCondition::HasRole { role, entity_id });
        }

        (query, Expand::new(self.expand))
    }
}
