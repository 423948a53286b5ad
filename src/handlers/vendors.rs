// src/handlers/vendors.rs

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
    filter::{vendors::VendorFilterParams, ExpandParams, PaginatedResponse},
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, RequireRole, VendorStaff},
    },
    models::vendor::{CreateVendorPayload, UpdateVendorPayload, Vendor},
};

#[utoipa::path(
    get,
    path = "/api/vendors",
    tag = "Vendors",
    params(VendorFilterParams),
    responses(
        (status = 200, description = "Fornecedores visíveis ao chamador", body = PaginatedResponse<Vendor>),
        (status = 403, description = "Papel sem acesso", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_vendors(
    State(app_state): State<AppState>,
    _role: RequireRole<VendorStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Query(params): Query<VendorFilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.vendor_service.list(&identity, params).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/vendors/{id}",
    tag = "Vendors",
    params(("id" = i64, Path, description = "ID do fornecedor"), ExpandParams),
    responses(
        (status = 200, description = "Fornecedor", body = Vendor),
        (status = 404, description = "Não encontrado ou fora do escopo", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_vendor(
    State(app_state): State<AppState>,
    _role: RequireRole<VendorStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(params): Query<ExpandParams>,
) -> Result<impl IntoResponse, AppError> {
    let vendor = app_state.vendor_service.get(&identity, id, &params.into()).await?;
    Ok(Json(vendor))
}

#[utoipa::path(
    post,
    path = "/api/vendors",
    tag = "Vendors",
    request_body = CreateVendorPayload,
    responses(
        (status = 201, description = "Fornecedor criado", body = Vendor),
        (status = 400, description = "Payload inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_vendor(
    State(app_state): State<AppState>,
    _role: RequireRole<AdminOnly>,
    Json(payload): Json<CreateVendorPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let vendor = app_state.vendor_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

#[utoipa::path(
    patch,
    path = "/api/vendors/{id}",
    tag = "Vendors",
    params(("id" = i64, Path, description = "ID do fornecedor")),
    request_body = UpdateVendorPayload,
    responses(
        (status = 200, description = "Fornecedor atualizado", body = Vendor),
        (status = 403, description = "Sem posse do fornecedor", body = ErrorBody),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_vendor(
    State(app_state): State<AppState>,
    _role: RequireRole<VendorStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateVendorPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let vendor = app_state.vendor_service.update(&identity, id, payload).await?;
    Ok(Json(vendor))
}

#[utoipa::path(
    delete,
    path = "/api/vendors/{id}",
    tag = "Vendors",
    params(("id" = i64, Path, description = "ID do fornecedor")),
    responses(
        (status = 204, description = "Fornecedor removido"),
        (status = 404, description = "Não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_vendor(
    State(app_state): State<AppState>,
    _role: RequireRole<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.vendor_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
