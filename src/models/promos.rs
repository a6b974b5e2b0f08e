// src/models/promos.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub id: Uuid,

    #[schema(example = "SPRING25")]
    pub code: String,

    #[schema(example = "25")]
    pub discount_percentage: Decimal,

    #[schema(example = 100)]
    pub max_redemptions: Option<i32>,

    #[schema(example = 12)]
    pub redemptions_count: i32,

    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Motivo pelo qual o código não pode ser usado agora, se houver.
    pub fn unusable_reason(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if !self.is_active {
            return Some("inactive");
        }
        if self.expires_at.is_some_and(|exp| exp <= now) {
            return Some("expired");
        }
        if self
            .max_redemptions
            .is_some_and(|max| self.redemptions_count >= max)
        {
            return Some("exhausted");
        }
        None
    }
}

#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub discount_percentage: Decimal,
    pub max_redemptions: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

// Registro append-only. Não há checagem de duplicidade aqui (ao contrário das finder fees).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoRedemption {
    pub id: Uuid,
    pub promo_code_id: Uuid,
    pub referred_party: String,
    #[schema(example = "30.00")]
    pub discount_applied: Decimal,
    pub purchase_session_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPromoRedemption {
    pub promo_code_id: Uuid,
    pub referred_party: String,
    pub discount_applied: Decimal,
    pub purchase_session_id: String,
}

/// Resposta pública usada pelo checkout do site.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidation {
    #[schema(example = "SPRING25")]
    pub code: String,
    pub valid: bool,
    #[schema(example = "25")]
    pub discount_percentage: Option<Decimal>,
    #[schema(example = "expired")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromoPayload {
    #[validate(length(min = 3, max = 32, message = "O código deve ter entre 3 e 32 caracteres."))]
    #[schema(example = "SPRING25")]
    pub code: String,

    #[schema(example = "25")]
    pub discount_percentage: Decimal,

    #[validate(range(min = 1, message = "O limite de usos deve ser pelo menos 1."))]
    #[schema(example = 100)]
    pub max_redemptions: Option<i32>,

    pub expires_at: Option<DateTime<Utc>>,
}
