use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAdmin,
    models::trials::{CreateTrialPayload, ExtendTrialPayload, TrialGrant},
};

// GET /api/admin/trials
#[utoipa::path(
    get,
    path = "/api/admin/trials",
    tag = "Trials",
    responses((status = 200, description = "Trials concedidos", body = Vec<TrialGrant>)),
    security(("api_jwt" = []))
)]
pub async fn list_trials(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<TrialGrant>>, AppError> {
    Ok(Json(app_state.trial_service.list().await?))
}

// POST /api/admin/trials
#[utoipa::path(
    post,
    path = "/api/admin/trials",
    tag = "Trials",
    request_body = CreateTrialPayload,
    responses(
        (status = 201, description = "Trial concedido", body = TrialGrant),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn grant_trial(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(payload): Json<CreateTrialPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let trial = app_state.trial_service.grant(payload).await?;
    tracing::info!(actor = %admin.sub, trial_id = %trial.id, "Trial concedido pelo painel");

    Ok((StatusCode::CREATED, Json(trial)))
}

// POST /api/admin/trials/{id}/extend
#[utoipa::path(
    post,
    path = "/api/admin/trials/{id}/extend",
    tag = "Trials",
    request_body = ExtendTrialPayload,
    params(("id" = Uuid, Path, description = "ID do trial")),
    responses(
        (status = 200, description = "Trial estendido", body = TrialGrant),
        (status = 400, description = "Trial revogado ou dias inválidos"),
        (status = 404, description = "Trial não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn extend_trial(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExtendTrialPayload>,
) -> Result<Json<TrialGrant>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    Ok(Json(app_state.trial_service.extend(id, payload.days).await?))
}

// POST /api/admin/trials/{id}/revoke
#[utoipa::path(
    post,
    path = "/api/admin/trials/{id}/revoke",
    tag = "Trials",
    params(("id" = Uuid, Path, description = "ID do trial")),
    responses(
        (status = 200, description = "Trial revogado", body = TrialGrant),
        (status = 404, description = "Trial não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn revoke_trial(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<TrialGrant>, AppError> {
    let trial = app_state.trial_service.revoke(id).await?;
    tracing::info!(actor = %admin.sub, trial_id = %id, "Trial revogado pelo painel");
    Ok(Json(trial))
}
