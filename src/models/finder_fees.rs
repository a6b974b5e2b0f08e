// src/models/finder_fees.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "finder_fee_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum FinderFeeStatus {
    Pending,  // Aguardando revisão
    Approved, // Aprovada, aguardando pagamento
    Rejected,
    Paid,
}

impl FinderFeeStatus {
    /// pending -> approved|rejected, approved -> paid. O resto é terminal.
    pub fn can_transition_to(self, next: FinderFeeStatus) -> bool {
        matches!(
            (self, next),
            (FinderFeeStatus::Pending, FinderFeeStatus::Approved)
                | (FinderFeeStatus::Pending, FinderFeeStatus::Rejected)
                | (FinderFeeStatus::Approved, FinderFeeStatus::Paid)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralPartner {
    pub id: Uuid,

    #[schema(example = "ABC123")]
    pub finder_code: String,

    #[schema(example = "Coach Rivera")]
    pub name: String,

    #[schema(example = "rivera@example.com")]
    pub email: String,

    // Parceiro recorrente ganha em toda renovação; os demais recebem uma taxa única.
    #[schema(example = false)]
    pub is_recurring: bool,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReferralPartner {
    pub finder_code: String,
    pub name: String,
    pub email: String,
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinderFeeRecord {
    pub id: Uuid,

    #[schema(example = "ABC123")]
    pub finder_code: String,

    #[schema(example = "director@club.org")]
    pub referred_party: String,

    #[schema(example = "1200.00")]
    pub purchase_amount: Decimal,

    #[schema(example = 12)]
    pub seat_count: i32,

    #[schema(example = "10")]
    pub fee_percentage: Decimal,

    #[schema(example = "120.00")]
    pub fee_amount: Decimal,

    pub is_first_purchase: bool,
    pub is_recurring_partner: bool,
    pub status: FinderFeeStatus,

    pub stripe_session_id: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFinderFee {
    pub finder_code: String,
    pub referred_party: String,
    pub purchase_amount: Decimal,
    pub seat_count: i32,
    pub fee_percentage: Decimal,
    pub fee_amount: Decimal,
    pub is_first_purchase: bool,
    pub is_recurring_partner: bool,
    pub stripe_session_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FinderFeeFilter {
    pub status: Option<FinderFeeStatus>,
}

/// Resumo de ganhos do parceiro pela tabela de volume.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerEarnings {
    #[schema(example = "ABC123")]
    pub finder_code: String,
    #[schema(example = 140)]
    pub total_referred_seats: i64,
    #[schema(example = "14000.00")]
    pub total_purchase_amount: Decimal,
    #[schema(example = "15")]
    pub commission_rate: Decimal,
    #[schema(example = "2100.00")]
    pub commission_amount: Decimal,
}

// --- Payloads do painel ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartnerPayload {
    #[validate(length(min = 3, max = 32, message = "O finder code deve ter entre 3 e 32 caracteres."))]
    #[schema(example = "ABC123")]
    pub finder_code: String,

    #[validate(length(min = 1, max = 200, message = "O nome é obrigatório."))]
    #[schema(example = "Coach Rivera")]
    pub name: String,

    #[validate(email(message = "E-mail inválido."))]
    #[schema(example = "rivera@example.com")]
    pub email: String,

    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFinderFeePayload {
    #[validate(length(min = 1, message = "O finder code é obrigatório."))]
    #[schema(example = "ABC123")]
    pub finder_code: String,

    #[validate(length(min = 1, max = 320, message = "A parte indicada é obrigatória."))]
    #[schema(example = "director@club.org")]
    pub referred_party: String,

    #[schema(example = "1200.00")]
    pub purchase_amount: Decimal,

    #[validate(range(min = 1, max = 10000))]
    #[schema(example = 12)]
    pub seat_count: i32,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFinderFeeStatusPayload {
    pub status: FinderFeeStatus,
}
