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
    models::{
        codes::SetActivePayload,
        promos::{CreatePromoPayload, PromoCode, PromoValidation},
    },
};

// GET /api/promo-codes/{code} (validação pública do checkout)
#[utoipa::path(
    get,
    path = "/api/promo-codes/{code}",
    tag = "Promo Codes",
    params(("code" = String, Path, description = "Promo code digitado no checkout")),
    responses((status = 200, description = "Resultado da validação", body = PromoValidation))
)]
pub async fn validate_promo(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PromoValidation>, AppError> {
    Ok(Json(app_state.promo_service.validate(&code).await?))
}

// GET /api/admin/promo-codes
#[utoipa::path(
    get,
    path = "/api/admin/promo-codes",
    tag = "Promo Codes",
    responses((status = 200, description = "Promo codes", body = Vec<PromoCode>)),
    security(("api_jwt" = []))
)]
pub async fn list_promos(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<PromoCode>>, AppError> {
    Ok(Json(app_state.promo_service.list().await?))
}

// POST /api/admin/promo-codes
#[utoipa::path(
    post,
    path = "/api/admin/promo-codes",
    tag = "Promo Codes",
    request_body = CreatePromoPayload,
    responses(
        (status = 201, description = "Promo code criado", body = PromoCode),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Código já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_promo(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePromoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let promo = app_state.promo_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(promo)))
}

// PATCH /api/admin/promo-codes/{id}/active
#[utoipa::path(
    patch,
    path = "/api/admin/promo-codes/{id}/active",
    tag = "Promo Codes",
    request_body = SetActivePayload,
    params(("id" = Uuid, Path, description = "ID do promo code")),
    responses(
        (status = 200, description = "Promo code atualizado", body = PromoCode),
        (status = 404, description = "Promo code não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_promo_active(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<Json<PromoCode>, AppError> {
    Ok(Json(
        app_state
            .promo_service
            .set_active(id, payload.is_active)
            .await?,
    ))
}
