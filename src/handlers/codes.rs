use axum::{
    extract::{Path, Query, State},
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
    models::codes::{
        CodeFilter, CodePair, CreateCodePairPayload, RedeemCodePayload, RedemptionCode,
        RedemptionOutcome, SetActivePayload,
    },
};

// POST /api/codes/redeem (chamado pelo app quando atleta/treinador entra na equipe)
#[utoipa::path(
    post,
    path = "/api/codes/redeem",
    tag = "Codes",
    request_body = RedeemCodePayload,
    responses(
        (status = 200, description = "Uso registrado", body = RedemptionOutcome),
        (status = 404, description = "Código inexistente ou desativado"),
        (status = 409, description = "Código sem vagas (code_at_capacity)")
    )
)]
pub async fn redeem_code(
    State(app_state): State<AppState>,
    Json(payload): Json<RedeemCodePayload>,
) -> Result<Json<RedemptionOutcome>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let outcome = app_state.ledger_service.redeem(&payload.code).await?;
    Ok(Json(outcome))
}

// GET /api/admin/codes
#[utoipa::path(
    get,
    path = "/api/admin/codes",
    tag = "Codes",
    params(CodeFilter),
    responses(
        (status = 200, description = "Códigos de resgate", body = Vec<RedemptionCode>),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_codes(
    State(app_state): State<AppState>,
    Query(filter): Query<CodeFilter>,
) -> Result<Json<Vec<RedemptionCode>>, AppError> {
    let codes = app_state.ledger_service.list_codes(&filter).await?;
    Ok(Json(codes))
}

// POST /api/admin/codes/pairs
#[utoipa::path(
    post,
    path = "/api/admin/codes/pairs",
    tag = "Codes",
    request_body = CreateCodePairPayload,
    responses(
        (status = 201, description = "Par treinador/equipe criado", body = CodePair),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_code_pair(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(payload): Json<CreateCodePairPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let pair = app_state
        .ledger_service
        .create_code_pair(payload.seat_count)
        .await?;
    tracing::info!(actor = %admin.sub, coach_code = %pair.coach.code, "Par criado pelo painel");

    Ok((StatusCode::CREATED, Json(pair)))
}

// PATCH /api/admin/codes/{id}/active
#[utoipa::path(
    patch,
    path = "/api/admin/codes/{id}/active",
    tag = "Codes",
    request_body = SetActivePayload,
    params(("id" = Uuid, Path, description = "ID do código")),
    responses(
        (status = 200, description = "Código atualizado", body = RedemptionCode),
        (status = 404, description = "Código não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_code_active(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<Json<RedemptionCode>, AppError> {
    let code = app_state
        .ledger_service
        .set_code_active(id, payload.is_active)
        .await?;
    Ok(Json(code))
}
