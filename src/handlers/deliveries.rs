// src/handlers/deliveries.rs
//
// Leitura: qualquer papel de equipe, recortado pelo escopo.
// Escrita: admin ou school_admin, com posse conferida no serviço.

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
    filter::{deliveries::DeliveryFilterParams, ExpandParams, PaginatedResponse},
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AnyStaff, RequireRole, SchoolStaff},
    },
    models::{
        change_log::ChangeLogEntry,
        delivery::{CreateDeliveryPayload, CreateOrderPayload, Delivery, Order, UpdateDeliveryPayload},
    },
};

// GET /api/deliveries
#[utoipa::path(
    get,
    path = "/api/deliveries",
    tag = "Deliveries",
    params(DeliveryFilterParams),
    responses(
        (status = 200, description = "Entregas visíveis ao chamador", body = PaginatedResponse<Delivery>),
        (status = 400, description = "Filtro inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_deliveries(
    State(app_state): State<AppState>,
    _role: RequireRole<AnyStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Query(params): Query<DeliveryFilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.delivery_service.list(&identity, params).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}",
    tag = "Deliveries",
    params(("id" = i64, Path, description = "ID da entrega"), ExpandParams),
    responses(
        (status = 200, description = "Entrega", body = Delivery),
        (status = 404, description = "Não encontrada ou fora do escopo", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_delivery(
    State(app_state): State<AppState>,
    _role: RequireRole<AnyStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(params): Query<ExpandParams>,
) -> Result<impl IntoResponse, AppError> {
    let delivery = app_state.delivery_service.get(&identity, id, &params.into()).await?;
    Ok(Json(delivery))
}

#[utoipa::path(
    post,
    path = "/api/deliveries",
    tag = "Deliveries",
    request_body = CreateDeliveryPayload,
    responses(
        (status = 201, description = "Entrega criada", body = Delivery),
        (status = 400, description = "Payload inválido", body = ErrorBody),
        (status = 403, description = "Sem posse da escola", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_delivery(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(payload): Json<CreateDeliveryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let delivery = app_state.delivery_service.create(&identity, payload).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

// PATCH /api/deliveries/{id}: auditado, 409 se a versão lida ficou velha
#[utoipa::path(
    patch,
    path = "/api/deliveries/{id}",
    tag = "Deliveries",
    params(("id" = i64, Path, description = "ID da entrega")),
    request_body = UpdateDeliveryPayload,
    responses(
        (status = 200, description = "Entrega atualizada", body = Delivery),
        (status = 403, description = "Sem posse da escola", body = ErrorBody),
        (status = 404, description = "Não encontrada", body = ErrorBody),
        (status = 409, description = "Alterada por outra requisição", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_delivery(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateDeliveryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let delivery = app_state.delivery_service.update(&identity, id, payload).await?;
    Ok(Json(delivery))
}

#[utoipa::path(
    delete,
    path = "/api/deliveries/{id}",
    tag = "Deliveries",
    params(("id" = i64, Path, description = "ID da entrega")),
    responses(
        (status = 204, description = "Entrega removida; pedidos ficam desvinculados"),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_delivery(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.delivery_service.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}/logs",
    tag = "Deliveries",
    params(("id" = i64, Path, description = "ID da entrega")),
    responses(
        (status = 200, description = "Histórico de alterações, mais recentes primeiro", body = Vec<ChangeLogEntry>),
        (status = 404, description = "Não encontrada ou fora do escopo", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delivery_logs(
    State(app_state): State<AppState>,
    _role: RequireRole<AnyStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let logs = app_state.delivery_service.logs(&identity, id).await?;
    Ok(Json(logs))
}

#[utoipa::path(
    post,
    path = "/api/deliveries/{id}/orders",
    tag = "Deliveries",
    params(("id" = i64, Path, description = "ID da entrega")),
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado na entrega", body = Order),
        (status = 400, description = "Payload inválido", body = ErrorBody),
        (status = 404, description = "Entrega não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn add_order(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let order = app_state.delivery_service.add_order(&identity, id, payload).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    delete,
    path = "/api/deliveries/{id}/orders/{order_id}",
    tag = "Deliveries",
    params(
        ("id" = i64, Path, description = "ID da entrega"),
        ("order_id" = i64, Path, description = "ID do pedido")
    ),
    responses(
        (status = 204, description = "Pedido desvinculado (continua existindo)"),
        (status = 404, description = "Pedido não pertence à entrega", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn detach_order(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path((id, order_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    app_state.delivery_service.detach_order(&identity, id, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
