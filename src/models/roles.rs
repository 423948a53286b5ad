// src/models/roles.rs

use std::{convert::Infallible, fmt, str::FromStr};

// Nomes de papéis conhecidos pelo sistema
pub const ADMIN: &str = "admin";
pub const SCHOOL_ADMIN: &str = "school_admin";
pub const VENDOR_ADMIN: &str = "vendor_admin";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleName {
    Admin,
    SchoolAdmin,
    VendorAdmin,
    // Papéis que o sistema não interpreta, preservados como vieram
    Other(String),
}

impl RoleName {
    pub fn parse(name: &str) -> Self {
        match name {
            ADMIN => RoleName::Admin,
            SCHOOL_ADMIN => RoleName::SchoolAdmin,
            VENDOR_ADMIN => RoleName::VendorAdmin,
            other => RoleName::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleName::Admin => ADMIN,
            RoleName::SchoolAdmin => SCHOOL_ADMIN,
            RoleName::VendorAdmin => VENDOR_ADMIN,
            RoleName::Other(name) => name,
        }
    }
}

/// Um token de papel já interpretado: `admin`, `school_admin:34`, `vendor_admin:12`.
///
/// A comparação é sempre exata (nome E entidade). `vendor_admin:12` nunca
/// satisfaz uma exigência de `vendor_admin:1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleClaim {
    pub role: RoleName,
    pub entity_id: Option<i64>,
}

impl RoleClaim {
    pub fn admin() -> Self {
        Self { role: RoleName::Admin, entity_id: None }
    }

    pub fn school_admin(school_id: i64) -> Self {
        Self { role: RoleName::SchoolAdmin, entity_id: Some(school_id) }
    }

    pub fn vendor_admin(vendor_id: i64) -> Self {
        Self { role: RoleName::VendorAdmin, entity_id: Some(vendor_id) }
    }

    /// Interpreta um único token. Sufixo inválido vira `None`, o token nunca é descartado.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.split_once(':') {
            Some((name, entity)) => Self {
                role: RoleName::parse(name.trim()),
                entity_id: parse_entity_id(entity),
            },
            None => Self { role: RoleName::parse(token), entity_id: None },
        }
    }
}

// Só dígitos ASCII: `u64::parse` aceitaria um `+` inicial
fn parse_entity_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok().and_then(|id| i64::try_from(id).ok())
}

impl fmt::Display for RoleClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity_id {
            Some(id) => write!(f, "{}:{}", self.role.as_str(), id),
            None => f.write_str(self.role.as_str()),
        }
    }
}

impl FromStr for RoleClaim {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Divide a string de papéis em `,` preservando a ordem (sem deduplicar).
pub fn parse_roles(roles: &str) -> Vec<RoleClaim> {
    roles
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(RoleClaim::parse)
        .collect()
}

pub fn format_roles(claims: &[RoleClaim]) -> String {
    claims
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

// ---
// Conjunto de papéis de um principal autenticado
// ---
// Gerado a cada requisição a partir do token; nunca fica em cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(Vec<RoleClaim>);

impl RoleSet {
    pub fn parse(roles: &str) -> Self {
        Self(parse_roles(roles))
    }

    pub fn claims(&self) -> &[RoleClaim] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(&RoleName::Admin)
    }

    pub fn has_role(&self, role: &RoleName) -> bool {
        self.0.iter().any(|claim| &claim.role == role)
    }

    /// Portão grosso: só compara nomes de papel, ignora o escopo da entidade.
    pub fn has_any_role(&self, allowed: &[&str]) -> bool {
        self.0
            .iter()
            .any(|claim| allowed.contains(&claim.role.as_str()))
    }

    /// Portão fino: compara a tupla (papel, entidade) exatamente.
    pub fn holds(&self, required: &RoleClaim) -> bool {
        self.0.iter().any(|claim| {
            claim == required || (claim.role == RoleName::Admin && required.role == RoleName::Admin)
        })
    }

    pub fn holds_any(&self, required: &[RoleClaim]) -> bool {
        required.iter().any(|claim| self.holds(claim))
    }

    /// IDs das entidades às quais os papéis `role` deste conjunto estão vinculados.
    pub fn entity_ids(&self, role: &RoleName) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .0
            .iter()
            .filter(|claim| &claim.role == role)
            .filter_map(|claim| claim.entity_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_roles(&self.0))
    }
}
