// src/handlers/orders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Query;
use validator::Validate;

use crate::{
    common::error::{AppError, ErrorBody},
    config::AppState,
    filter::ExpandParams,
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AnyStaff, RequireRole, SchoolStaff},
    },
    models::{
        change_log::ChangeLogEntry,
        delivery::{Order, UpdateOrderPayload},
    },
};

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "ID do pedido"), ExpandParams),
    responses(
        (status = 200, description = "Pedido", body = Order),
        (status = 404, description = "Não encontrado ou fora do escopo", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    _role: RequireRole<AnyStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(params): Query<ExpandParams>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.order_service.get(&identity, id, &params.into()).await?;
    Ok(Json(order))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "ID do pedido")),
    request_body = UpdateOrderPayload,
    responses(
        (status = 200, description = "Pedido atualizado", body = Order),
        (status = 403, description = "Sem posse da escola da entrega", body = ErrorBody),
        (status = 409, description = "Alterado por outra requisição", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_order(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let order = app_state.order_service.update(&identity, id, payload).await?;
    Ok(Json(order))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    tag = "Orders",
    params(("id" = i64, Path, description = "ID do pedido")),
    responses(
        (status = 204, description = "Pedido removido"),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_order(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.order_service.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/logs",
    tag = "Orders",
    params(("id" = i64, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Histórico de alterações, mais recentes primeiro", body = Vec<ChangeLogEntry>),
        (status = 404, description = "Não encontrado ou fora do escopo", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn order_logs(
    State(app_state): State<AppState>,
    _role: RequireRole<AnyStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let logs = app_state.order_service.logs(&identity, id).await?;
    Ok(Json(logs))
}
