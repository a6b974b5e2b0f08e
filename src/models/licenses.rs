// src/models/licenses.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::codes::NewCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
}

impl SubscriptionStatus {
    /// Traduz o status de assinatura do Stripe.
    pub fn from_stripe(status: &str) -> Self {
        match status {
            "active" | "trialing" => SubscriptionStatus::Active,
            "canceled" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Inactive,
        }
    }
}

// Uma licença por equipe (ou por equipe dentro de uma organização).
// `seats_consumed` não é coluna: vem do `uses_count` do código de equipe.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseGrant {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,

    #[schema(example = "U12 Falcons")]
    pub team_name: String,

    #[schema(example = "coach@club.org")]
    pub payer_email: String,

    pub coach_code_id: Uuid,
    pub member_code_id: Uuid,

    #[schema(example = 12)]
    pub seat_total: i32,
    #[schema(example = 4)]
    pub seats_consumed: i32,

    #[schema(example = "10")]
    pub discount_percentage: Decimal,
    #[schema(example = "9.00")]
    pub price_per_seat: Decimal,
    #[schema(example = "108.00")]
    pub amount_paid: Decimal,

    pub subscription_status: SubscriptionStatus,

    pub stripe_session_id: Option<String>,
    pub stripe_subscription_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationLicense {
    pub id: Uuid,

    #[schema(example = "Riverside Youth Soccer")]
    pub organization_name: String,

    pub payer_email: String,

    #[schema(example = 150)]
    pub total_seats: i32,
    #[schema(example = 6)]
    pub number_of_teams: i32,

    pub amount_paid: Decimal,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tudo o que o store precisa para criar uma equipe numa transação:
/// os dois códigos, o vínculo entre eles e a licença.
#[derive(Debug, Clone)]
pub struct NewTeamLicense {
    pub organization_id: Option<Uuid>,
    pub team_name: String,
    pub payer_email: String,
    pub coach: NewCode,
    pub member: NewCode,
    pub discount_percentage: Decimal,
    pub price_per_seat: Decimal,
    pub amount_paid: Decimal,
    pub stripe_session_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

impl NewTeamLicense {
    pub fn seat_total(&self) -> i32 {
        self.member.max_uses
    }
}

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub organization_name: String,
    pub payer_email: String,
    pub total_seats: i32,
    pub number_of_teams: i32,
    pub amount_paid: Decimal,
    pub stripe_session_id: Option<String>,
}

/// Equipe provisionada: a licença e os dois códigos já vinculados.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamLicense {
    pub grant: LicenseGrant,
    #[schema(example = "COACH-7KQ2-ZP9M-4HXC")]
    pub coach_code: String,
    #[schema(example = "TEAM-H3WD-9NQA-X2LE")]
    pub member_code: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TeamProvisionStatus {
    Succeeded {
        #[serde(rename = "grantId")]
        grant_id: Uuid,
        #[serde(rename = "coachCode")]
        coach_code: String,
        #[serde(rename = "memberCode")]
        member_code: String,
    },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamProvisionResult {
    #[schema(example = 1)]
    pub team_index: i32,
    #[schema(example = "Riverside Youth Soccer - Team 1")]
    pub team_name: String,
    #[schema(example = 25)]
    pub seats: i32,
    pub result: TeamProvisionStatus,
}

impl TeamProvisionResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.result, TeamProvisionStatus::Succeeded { .. })
    }
}

/// Relatório do fan-out: a organização e o resultado de cada equipe.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationProvisioning {
    pub organization: OrganizationLicense,
    pub teams: Vec<TeamProvisionResult>,
}

impl OrganizationProvisioning {
    pub fn failed_teams(&self) -> usize {
        self.teams.iter().filter(|t| !t.succeeded()).count()
    }

    pub fn allocated_seats(&self) -> i32 {
        self.teams.iter().filter(|t| t.succeeded()).map(|t| t.seats).sum()
    }
}

/// Pedido de uma equipe avulsa (compra simples ou criação manual).
#[derive(Debug, Clone)]
pub struct TeamOrder {
    pub team_name: String,
    pub payer_email: String,
    pub seat_count: i32,
    pub discount_percentage: Decimal,
    pub price_per_seat: Decimal,
    pub amount_paid: Decimal,
    pub stripe_session_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

/// Pedido de organização com várias equipes.
#[derive(Debug, Clone)]
pub struct OrganizationOrder {
    pub organization_name: String,
    pub payer_email: String,
    pub total_seats: i32,
    pub number_of_teams: i32,
    pub seats_per_team: Option<Vec<i32>>,
    pub discount_percentage: Decimal,
    pub price_per_seat: Decimal,
    pub amount_paid: Decimal,
    pub stripe_session_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

// --- Payloads do painel ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationPayload {
    #[validate(length(min = 1, max = 200, message = "O nome da organização é obrigatório."))]
    #[schema(example = "Riverside Youth Soccer")]
    pub organization_name: String,

    #[validate(email(message = "E-mail inválido."))]
    #[schema(example = "director@club.org")]
    pub payer_email: String,

    #[validate(range(min = 1, max = 10000))]
    #[schema(example = 150)]
    pub total_seats: i32,

    #[validate(range(min = 1, max = 100))]
    #[schema(example = 6)]
    pub number_of_teams: i32,

    pub seats_per_team: Option<Vec<i32>>,
}
