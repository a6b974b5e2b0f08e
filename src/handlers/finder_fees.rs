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
    models::finder_fees::{
        CreateFinderFeePayload, CreatePartnerPayload, FinderFeeFilter, FinderFeeRecord,
        PartnerEarnings, ReferralPartner, UpdateFinderFeeStatusPayload,
    },
};

// ---
// Parceiros
// ---

// GET /api/admin/partners
#[utoipa::path(
    get,
    path = "/api/admin/partners",
    tag = "Finder Fees",
    responses((status = 200, description = "Parceiros de indicação", body = Vec<ReferralPartner>)),
    security(("api_jwt" = []))
)]
pub async fn list_partners(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<ReferralPartner>>, AppError> {
    Ok(Json(app_state.finder_fee_service.list_partners().await?))
}

// POST /api/admin/partners
#[utoipa::path(
    post,
    path = "/api/admin/partners",
    tag = "Finder Fees",
    request_body = CreatePartnerPayload,
    responses(
        (status = 201, description = "Parceiro cadastrado", body = ReferralPartner),
        (status = 409, description = "Finder code já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_partner(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePartnerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let partner = app_state.finder_fee_service.create_partner(payload).await?;
    Ok((StatusCode::CREATED, Json(partner)))
}

// GET /api/admin/partners/{code}/earnings
#[utoipa::path(
    get,
    path = "/api/admin/partners/{code}/earnings",
    tag = "Finder Fees",
    params(("code" = String, Path, description = "Finder code do parceiro")),
    responses(
        (status = 200, description = "Ganhos pela tabela de volume", body = PartnerEarnings),
        (status = 404, description = "Parceiro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn partner_earnings(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PartnerEarnings>, AppError> {
    Ok(Json(app_state.finder_fee_service.partner_earnings(&code).await?))
}

// ---
// Finder fees
// ---

// GET /api/admin/finder-fees
#[utoipa::path(
    get,
    path = "/api/admin/finder-fees",
    tag = "Finder Fees",
    params(FinderFeeFilter),
    responses((status = 200, description = "Finder fees registradas", body = Vec<FinderFeeRecord>)),
    security(("api_jwt" = []))
)]
pub async fn list_finder_fees(
    State(app_state): State<AppState>,
    Query(filter): Query<FinderFeeFilter>,
) -> Result<Json<Vec<FinderFeeRecord>>, AppError> {
    Ok(Json(app_state.finder_fee_service.list(&filter).await?))
}

// POST /api/admin/finder-fees
#[utoipa::path(
    post,
    path = "/api/admin/finder-fees",
    tag = "Finder Fees",
    request_body = CreateFinderFeePayload,
    responses(
        (status = 201, description = "Finder fee registrada", body = FinderFeeRecord),
        (status = 404, description = "Parceiro não encontrado"),
        (status = 409, description = "Indicação já registrada (duplicate_finder_fee)")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_finder_fee(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(payload): Json<CreateFinderFeePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let fee = app_state.finder_fee_service.create_manual(payload).await?;
    tracing::info!(actor = %admin.sub, fee_id = %fee.id, "Finder fee criada pelo painel");

    Ok((StatusCode::CREATED, Json(fee)))
}

// PATCH /api/admin/finder-fees/{id}/status
#[utoipa::path(
    patch,
    path = "/api/admin/finder-fees/{id}/status",
    tag = "Finder Fees",
    request_body = UpdateFinderFeeStatusPayload,
    params(("id" = Uuid, Path, description = "ID da finder fee")),
    responses(
        (status = 200, description = "Status alterado", body = FinderFeeRecord),
        (status = 400, description = "Transição não permitida"),
        (status = 404, description = "Finder fee não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_finder_fee_status(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFinderFeeStatusPayload>,
) -> Result<Json<FinderFeeRecord>, AppError> {
    let fee = app_state
        .finder_fee_service
        .update_status(id, payload.status)
        .await?;
    tracing::info!(actor = %admin.sub, fee_id = %id, status = ?fee.status, "Finder fee revisada");
    Ok(Json(fee))
}
