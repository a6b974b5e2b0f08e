use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{AdminLoginPayload, AuthResponse},
};

// POST /api/admin/login
#[utoipa::path(
    post,
    path = "/api/admin/login",
    tag = "Auth",
    request_body = AdminLoginPayload,
    responses(
        (status = 200, description = "Token do painel (válido por 12 horas)", body = AuthResponse),
        (status = 401, description = "Senha inválida")
    )
)]
pub async fn admin_login(
    State(app_state): State<AppState>,
    Json(payload): Json<AdminLoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let token = app_state.auth_service.login_admin(&payload.password).await?;

    Ok(Json(AuthResponse { token }))
}
