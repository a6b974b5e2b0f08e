// src/models/trials.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "trial_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Active,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrialGrant {
    pub id: Uuid,

    #[schema(example = "athlete.parent@example.com")]
    pub user_email: String,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: TrialStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrialGrant {
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
        self.status == TrialStatus::Active && self.ends_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewTrialGrant {
    pub user_email: String,
    pub ends_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrialPayload {
    #[validate(email(message = "E-mail inválido."))]
    #[schema(example = "athlete.parent@example.com")]
    pub user_email: String,

    #[validate(range(min = 1, max = 365, message = "O trial deve ter entre 1 e 365 dias."))]
    #[schema(example = 14)]
    pub days: i64,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExtendTrialPayload {
    #[validate(range(min = 1, max = 365, message = "A extensão deve ter entre 1 e 365 dias."))]
    #[schema(example = 7)]
    pub days: i64,
}
