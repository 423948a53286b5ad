// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{AppError, ErrorBody},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{ImpersonatePayload, LoginPayload, LoginResponse, RefreshPayload, TokenResponse, User},
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Login efetuado", body = LoginResponse),
        (status = 400, description = "Payload inválido", body = ErrorBody),
        (status = 401, description = "E-mail ou senha inválidos", body = ErrorBody)
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let session = app_state.auth_service.login(&payload.email, &payload.password).await?;
    Ok(Json(session))
}

// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshPayload,
    responses(
        (status = 200, description = "Novo par de tokens; o refresh anterior deixa de valer", body = LoginResponse),
        (status = 401, description = "Refresh token inválido, expirado ou já usado", body = ErrorBody)
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let session = app_state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(Json(session))
}

// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    request_body = RefreshPayload,
    responses((status = 204, description = "Sessão encerrada")),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<RefreshPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_service.logout(&payload.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Não autenticado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn me(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Result<Json<User>, AppError> {
    let user = app_state.auth_service.me(&identity).await?;
    Ok(Json(user))
}

// POST /api/auth/impersonate
#[utoipa::path(
    post,
    path = "/api/auth/impersonate",
    tag = "Auth",
    request_body = ImpersonatePayload,
    responses(
        (status = 200, description = "Token emitido com a identidade do usuário alvo", body = TokenResponse),
        (status = 403, description = "Apenas admin", body = ErrorBody),
        (status = 404, description = "Usuário não encontrado", body = ErrorBody)
    ),
    security(("api_jwt" = []))
)]
pub async fn impersonate(
    State(app_state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(payload): Json<ImpersonatePayload>,
) -> Result<Json<TokenResponse>, AppError> {
    let issued = app_state.auth_service.impersonate(&identity, payload.user_id).await?;
    Ok(Json(issued))
}
