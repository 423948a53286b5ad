// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

/// Router completo da API; o estado já vem montado (Postgres ou memória).
pub fn app(app_state: AppState) -> Router {
    // Sessão e impersonação exigem token
    let session_routes = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::me))
        .route("/impersonate", post(handlers::auth::impersonate))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Login e refresh são públicos
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .merge(session_routes);

    let user_routes = Router::new()
        .route("/"
               ,get(handlers::users::list_users)
               .post(handlers::users::create_user)
        )
        .route("/{id}"
               ,get(handlers::users::get_user)
               .patch(handlers::users::update_user)
               .put(handlers::users::update_user)
               .delete(handlers::users::delete_user)
        );

    let school_routes = Router::new()
        .route("/"
               ,get(handlers::schools::list_schools)
               .post(handlers::schools::create_school)
        )
        .route("/{id}"
               ,get(handlers::schools::get_school)
               .patch(handlers::schools::update_school)
               .put(handlers::schools::update_school)
               .delete(handlers::schools::delete_school)
        );

    let vendor_routes = Router::new()
        .route("/"
               ,get(handlers::vendors::list_vendors)
               .post(handlers::vendors::create_vendor)
        )
        .route("/{id}"
               ,get(handlers::vendors::get_vendor)
               .patch(handlers::vendors::update_vendor)
               .put(handlers::vendors::update_vendor)
               .delete(handlers::vendors::delete_vendor)
        );

    let delivery_routes = Router::new()
        .route("/"
               ,get(handlers::deliveries::list_deliveries)
               .post(handlers::deliveries::create_delivery)
        )
        .route("/{id}"
               ,get(handlers::deliveries::get_delivery)
               .patch(handlers::deliveries::update_delivery)
               .put(handlers::deliveries::update_delivery)
               .delete(handlers::deliveries::delete_delivery)
        )
        .route("/{id}/logs", get(handlers::deliveries::delivery_logs))
        .route("/{id}/orders", post(handlers::deliveries::add_order))
        .route("/{id}/orders/{order_id}", delete(handlers::deliveries::detach_order));

    let order_routes = Router::new()
        .route("/{id}"
               ,get(handlers::orders::get_order)
               .patch(handlers::orders::update_order)
               .put(handlers::orders::update_order)
               .delete(handlers::orders::delete_order)
        )
        .route("/{id}/logs", get(handlers::orders::order_logs));

    // Recursos: tudo passa pelo auth_guard
    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/schools", school_routes)
        .nest("/api/vendors", vendor_routes)
        .nest("/api/deliveries", delivery_routes)
        .nest("/api/orders", order_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .with_state(app_state)
}
