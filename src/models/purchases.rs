// src/models/purchases.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{
    finder_fees::FinderFeeRecord,
    licenses::{OrganizationProvisioning, TeamLicense},
    promos::PromoRedemption,
};

/// Compra confirmada, já extraída do evento do Stripe.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseConfirmed {
    pub session_id: String,
    pub payer_email: String,
    pub amount_paid: Decimal,
    pub seat_count: i32,
    pub discount_percentage: Decimal,
    pub price_per_seat: Decimal,
    pub team_name: Option<String>,
    pub organization: Option<OrganizationPurchase>,
    pub promo_code: Option<String>,
    pub finder_code: Option<String>,
    pub subscription_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationPurchase {
    pub organization_name: String,
    pub number_of_teams: i32,
    pub seats_per_team: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum ProvisionedLicense {
    Team(TeamLicense),
    Organization(OrganizationProvisioning),
}

impl ProvisionedLicense {
    /// Todos os códigos gerados, na ordem em que vão no e-mail.
    pub fn all_codes(&self) -> Vec<(String, String, String)> {
        match self {
            ProvisionedLicense::Team(team) => vec![(
                team.grant.team_name.clone(),
                team.coach_code.clone(),
                team.member_code.clone(),
            )],
            ProvisionedLicense::Organization(org) => org
                .teams
                .iter()
                .filter_map(|t| match &t.result {
                    crate::models::licenses::TeamProvisionStatus::Succeeded {
                        coach_code,
                        member_code,
                        ..
                    } => Some((t.team_name.clone(), coach_code.clone(), member_code.clone())),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOutcome {
    pub session_id: String,
    pub license: ProvisionedLicense,
    pub promo_redemption: Option<PromoRedemption>,
    pub finder_fee: Option<FinderFeeRecord>,
    pub confirmation_sent: bool,
    // Falhas de contabilidade (promo/finder fee) que não derrubam a compra
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum PurchaseHandling {
    Processed(PurchaseOutcome),
    AlreadyProcessed {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Resposta do webhook, por tipo de evento.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum WebhookOutcome {
    Purchase(PurchaseHandling),
    SubscriptionSynced {
        #[serde(rename = "subscriptionId")]
        subscription_id: String,
        #[serde(rename = "grantsUpdated")]
        grants_updated: u64,
    },
    Ignored {
        #[serde(rename = "eventType")]
        event_type: String,
    },
}
