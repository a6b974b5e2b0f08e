use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{error::AppError, normalize::normalize_email},
    config::AppState,
    middleware::auth::AuthenticatedAdmin,
    models::licenses::{
        CreateOrganizationPayload, LicenseGrant, OrganizationOrder, OrganizationProvisioning,
    },
    services::commission,
};

// POST /api/admin/organizations (provisionamento manual, sem Stripe)
#[utoipa::path(
    post,
    path = "/api/admin/organizations",
    tag = "Organizations",
    request_body = CreateOrganizationPayload,
    responses(
        (status = 201, description = "Organização criada, com o resultado de cada equipe", body = OrganizationProvisioning),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_organization(
    State(app_state): State<AppState>,
    AuthenticatedAdmin(admin): AuthenticatedAdmin,
    Json(payload): Json<CreateOrganizationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let quote = commission::quote(payload.total_seats, app_state.list_price_per_seat);
    let provisioning = app_state
        .organization_service
        .provision_organization(OrganizationOrder {
            organization_name: payload.organization_name.trim().to_string(),
            payer_email: normalize_email(&payload.payer_email),
            total_seats: payload.total_seats,
            number_of_teams: payload.number_of_teams,
            seats_per_team: payload.seats_per_team,
            discount_percentage: quote.discount_percentage,
            price_per_seat: quote.price_per_seat,
            amount_paid: quote.total,
            stripe_session_id: None,
            stripe_subscription_id: None,
        })
        .await?;
    tracing::info!(actor = %admin.sub, organization_id = %provisioning.organization.id, "Organização criada pelo painel");

    Ok((StatusCode::CREATED, Json(provisioning)))
}

// GET /api/admin/organizations/{id}/teams
#[utoipa::path(
    get,
    path = "/api/admin/organizations/{id}/teams",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da organização")),
    responses(
        (status = 200, description = "Licenças das equipes, com assentos consumidos", body = Vec<LicenseGrant>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_teams(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LicenseGrant>>, AppError> {
    let grants = app_state.organization_service.list_teams(id).await?;
    Ok(Json(grants))
}

// GET /api/admin/grants/{id}
#[utoipa::path(
    get,
    path = "/api/admin/grants/{id}",
    tag = "Organizations",
    params(("id" = Uuid, Path, description = "ID da licença")),
    responses(
        (status = 200, description = "Licença", body = LicenseGrant),
        (status = 404, description = "Licença não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_grant(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LicenseGrant>, AppError> {
    let grant = app_state.organization_service.get_grant(id).await?;
    Ok(Json(grant))
}
