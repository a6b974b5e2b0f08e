// src/models/codes.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "code_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Coach,  // Uso único, prefixo COACH
    Member, // Multiuso (um por assento), prefixo TEAM
}

impl CodeKind {
    /// Prefixo impresso no código.
    pub fn prefix(self) -> &'static str {
        match self {
            CodeKind::Coach => "COACH",
            CodeKind::Member => "TEAM",
        }
    }

    /// Atletas e treinadores ocupam assento; o fluxo de pais nunca passa por aqui.
    pub fn consumes_seat(self) -> bool {
        matches!(self, CodeKind::Coach | CodeKind::Member)
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionCode {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(example = "TEAM-7KQ2-ZP9M-4HXC")]
    pub code: String,

    pub kind: CodeKind,

    #[schema(example = 12)]
    pub max_uses: i32,

    #[schema(example = 3)]
    pub uses_count: i32,

    pub linked_code_id: Option<Uuid>,

    #[schema(example = true)]
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RedemptionCode {
    pub fn is_exhausted(&self) -> bool {
        self.uses_count >= self.max_uses
    }

    pub fn remaining_uses(&self) -> i32 {
        (self.max_uses - self.uses_count).max(0)
    }
}

/// Dados de um código ainda não persistido.
#[derive(Debug, Clone)]
pub struct NewCode {
    pub code: String,
    pub kind: CodeKind,
    pub max_uses: i32,
}

/// Par treinador/equipe criado numa única transação.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodePair {
    pub coach: RedemptionCode,
    pub member: RedemptionCode,
}

/// Resultado bruto da tentativa de resgate no store.
#[derive(Debug, Clone)]
pub enum RedeemAttempt {
    Redeemed(RedemptionCode),
    AtCapacity(RedemptionCode),
    Missing,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionOutcome {
    #[schema(example = "TEAM-7KQ2-ZP9M-4HXC")]
    pub code: String,
    pub kind: CodeKind,
    pub linked_code_id: Option<Uuid>,
    pub uses_count: i32,
    pub max_uses: i32,
    pub remaining_uses: i32,
    pub consumes_seat: bool,
}

impl From<RedemptionCode> for RedemptionOutcome {
    fn from(code: RedemptionCode) -> Self {
        Self {
            remaining_uses: code.remaining_uses(),
            consumes_seat: code.kind.consumes_seat(),
            code: code.code,
            kind: code.kind,
            linked_code_id: code.linked_code_id,
            uses_count: code.uses_count,
            max_uses: code.max_uses,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CodeFilter {
    pub kind: Option<CodeKind>,
    pub is_active: Option<bool>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCodePayload {
    #[validate(length(min = 1, max = 64, message = "O código é obrigatório."))]
    #[schema(example = "TEAM-7KQ2-ZP9M-4HXC")]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodePairPayload {
    #[validate(range(min = 1, max = 10000, message = "A quantidade de assentos deve estar entre 1 e 10000."))]
    #[schema(example = 12)]
    pub seat_count: i32,
}

// Ativar/desativar (códigos e promo codes)
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActivePayload {
    pub is_active: bool,
}
