// src/handlers/schools.rs

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
    filter::{schools::SchoolFilterParams, ExpandParams, PaginatedResponse},
    middleware::{
        auth::AuthenticatedUser,
        rbac::{AdminOnly, RequireRole, SchoolStaff},
    },
    models::school::{CreateSchoolPayload, School, UpdateSchoolPayload},
};

#[utoipa::path(
    get,
    path = "/api/schools",
    tag = "Schools",
    params(SchoolFilterParams),
    responses(
        (status = 200, description = "Escolas visíveis ao chamador", body = PaginatedResponse<School>),
        (status = 403, description = "Papel sem acesso", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_schools(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Query(params): Query<SchoolFilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.school_service.list(&identity, params).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/schools/{id}",
    tag = "Schools",
    params(("id" = i64, Path, description = "ID da escola"), ExpandParams),
    responses(
        (status = 200, description = "Escola", body = School),
        (status = 404, description = "Não encontrada ou fora do escopo", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_school(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Query(params): Query<ExpandParams>,
) -> Result<impl IntoResponse, AppError> {
    let school = app_state.school_service.get(&identity, id, &params.into()).await?;
    Ok(Json(school))
}

#[utoipa::path(
    post,
    path = "/api/schools",
    tag = "Schools",
    request_body = CreateSchoolPayload,
    responses(
        (status = 201, description = "Escola criada", body = School),
        (status = 400, description = "Payload inválido", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_school(
    State(app_state): State<AppState>,
    _role: RequireRole<AdminOnly>,
    Json(payload): Json<CreateSchoolPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let school = app_state.school_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    patch,
    path = "/api/schools/{id}",
    tag = "Schools",
    params(("id" = i64, Path, description = "ID da escola")),
    request_body = UpdateSchoolPayload,
    responses(
        (status = 200, description = "Escola atualizada", body = School),
        (status = 403, description = "Sem posse da escola", body = ErrorBody),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_school(
    State(app_state): State<AppState>,
    _role: RequireRole<SchoolStaff>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSchoolPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let school = app_state.school_service.update(&identity, id, payload).await?;
    Ok(Json(school))
}

#[utoipa::path(
    delete,
    path = "/api/schools/{id}",
    tag = "Schools",
    params(("id" = i64, Path, description = "ID da escola")),
    responses(
        (status = 204, description = "Escola removida"),
        (status = 404, description = "Não encontrada", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_school(
    State(app_state): State<AppState>,
    _role: RequireRole<AdminOnly>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    app_state.school_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
