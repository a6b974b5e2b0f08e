// src/models/pricing.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    #[validate(range(min = 1, max = 10000, message = "A quantidade de assentos deve estar entre 1 e 10000."))]
    pub seats: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatQuote {
    #[schema(example = 120)]
    pub seat_count: i32,
    #[schema(example = "10.00")]
    pub list_price_per_seat: Decimal,
    #[schema(example = "15")]
    pub discount_percentage: Decimal,
    #[schema(example = "8.50")]
    pub price_per_seat: Decimal,
    #[schema(example = "1020.00")]
    pub total: Decimal,
}
