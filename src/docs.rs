// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::filter;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::auth::impersonate,

        // --- Users ---
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,

        // --- Schools ---
        handlers::schools::list_schools,
        handlers::schools::get_school,
        handlers::schools::create_school,
        handlers::schools::update_school,
        handlers::schools::delete_school,

        // --- Vendors ---
        handlers::vendors::list_vendors,
        handlers::vendors::get_vendor,
        handlers::vendors::create_vendor,
        handlers::vendors::update_vendor,
        handlers::vendors::delete_vendor,

        // --- Deliveries ---
        handlers::deliveries::list_deliveries,
        handlers::deliveries::get_delivery,
        handlers::deliveries::create_delivery,
        handlers::deliveries::update_delivery,
        handlers::deliveries::delete_delivery,
        handlers::deliveries::delivery_logs,
        handlers::deliveries::add_order,
        handlers::deliveries::detach_order,

        // --- Orders ---
        handlers::orders::get_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::orders::order_logs,
    ),
    components(
        schemas(
            common::error::ErrorBody,
            filter::PaginationMeta,

            // --- Auth ---
            models::auth::User,
            models::auth::LoginPayload,
            models::auth::RefreshPayload,
            models::auth::ImpersonatePayload,
            models::auth::LoginResponse,
            models::auth::TokenResponse,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,
            models::file::File,

            // --- Schools & Vendors ---
            models::school::School,
            models::school::CreateSchoolPayload,
            models::school::UpdateSchoolPayload,
            models::vendor::VendorCategory,
            models::vendor::Vendor,
            models::vendor::CreateVendorPayload,
            models::vendor::UpdateVendorPayload,

            // --- Deliveries & Orders ---
            models::delivery::OrderStatus,
            models::delivery::Delivery,
            models::delivery::Order,
            models::delivery::CreateDeliveryPayload,
            models::delivery::UpdateDeliveryPayload,
            models::delivery::CreateOrderPayload,
            models::delivery::UpdateOrderPayload,
            models::change_log::ChangeLogEntry,
        )
    ),
    tags(
        (name = "Auth", description = "Login, sessão e impersonação"),
        (name = "Users", description = "Gestão de usuários (admin)"),
        (name = "Schools", description = "Escolas"),
        (name = "Vendors", description = "Fornecedores"),
        (name = "Deliveries", description = "Entregas e seus pedidos"),
        (name = "Orders", description = "Pedidos e histórico de alterações")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
