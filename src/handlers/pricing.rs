use axum::{
    extract::{Query, State},
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::pricing::{QuoteQuery, SeatQuote},
    services::commission,
};

// GET /api/pricing/quote?seats=N
#[utoipa::path(
    get,
    path = "/api/pricing/quote",
    tag = "Pricing",
    params(QuoteQuery),
    responses(
        (status = 200, description = "Preço por assento com o desconto da faixa", body = SeatQuote),
        (status = 400, description = "Quantidade de assentos inválida")
    )
)]
pub async fn quote(
    State(app_state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<SeatQuote>, AppError> {
    query.validate().map_err(AppError::ValidationError)?;

    Ok(Json(commission::quote(query.seats, app_state.list_price_per_seat)))
}
