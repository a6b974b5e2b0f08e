use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{common::error::AppError, config::AppState};

// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Serviço e store respondendo"),
        (status = 500, description = "Store indisponível")
    )
)]
pub async fn health(State(app_state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    app_state.store.health_check().await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "status": "ok", "store": app_state.store.backend_name() })),
    ))
}
