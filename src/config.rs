// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::Store,
    filter::{DateBoundary, QueryOptions},
    services::{
        auth::AuthService, delivery_service::DeliveryService, order_service::OrderService,
        school_service::SchoolService, token::TokenService, user_service::UserService,
        vendor_service::VendorService,
    },
};

/// Conta de admin criada (ou renovada) na inicialização.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub base_url: String,
    pub port: u16,
    pub max_page_size: i64,
    pub scheduled_to_boundary: DateBoundary,
    pub db_max_connections: u32,
    pub admin: Option<AdminSeed>,
}

// Variável opcional com valor padrão; valor presente mas inválido é erro
fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} inválida: {e}")),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET não pode ser vazio");
        }

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => Some(AdminSeed {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrador".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            base_url: env::var("BASE_URL").unwrap_or_default(),
            port: var_or("PORT", 8080)?,
            max_page_size: var_or("MAX_PAGE_SIZE", 100)?,
            scheduled_to_boundary: var_or("SCHEDULED_TO_DATE_BOUNDARY", DateBoundary::StartOfDay)?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            admin,
        })
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            max_page_size: self.max_page_size,
            scheduled_to_boundary: self.scheduled_to_boundary,
        }
    }
}

/// Abre o pool do Postgres; falha rápido se o banco não responder.
pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(db_pool)
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub school_service: SchoolService,
    pub vendor_service: VendorService,
    pub delivery_service: DeliveryService,
    pub order_service: OrderService,
}

impl AppState {
    // --- Monta o grafo de dependências sobre o store injetado ---
    pub fn new(config: &Config, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.jwt_secret)?;
        let options = config.query_options();

        Ok(Self {
            auth_service: AuthService::new(store.clone(), tokens.clone()),
            user_service: UserService::new(store.clone(), options, config.base_url.clone()),
            school_service: SchoolService::new(store.clone(), options),
            vendor_service: VendorService::new(store.clone(), options),
            delivery_service: DeliveryService::new(store.clone(), options),
            order_service: OrderService::new(store.clone()),
            tokens,
            store,
        })
    }
}
