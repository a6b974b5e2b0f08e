// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Público ---
        handlers::health::health,
        handlers::pricing::quote,
        handlers::promos::validate_promo,
        handlers::codes::redeem_code,
        handlers::webhooks::stripe_webhook,

        // --- Auth ---
        handlers::auth::admin_login,

        // --- Codes ---
        handlers::codes::list_codes,
        handlers::codes::create_code_pair,
        handlers::codes::set_code_active,

        // --- Organizations ---
        handlers::organizations::create_organization,
        handlers::organizations::list_teams,
        handlers::organizations::get_grant,

        // --- Finder Fees ---
        handlers::finder_fees::list_partners,
        handlers::finder_fees::create_partner,
        handlers::finder_fees::partner_earnings,
        handlers::finder_fees::list_finder_fees,
        handlers::finder_fees::create_finder_fee,
        handlers::finder_fees::update_finder_fee_status,

        // --- Promo Codes ---
        handlers::promos::list_promos,
        handlers::promos::create_promo,
        handlers::promos::set_promo_active,

        // --- Trials ---
        handlers::trials::list_trials,
        handlers::trials::grant_trial,
        handlers::trials::extend_trial,
        handlers::trials::revoke_trial,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::AdminLoginPayload,
            models::auth::AuthResponse,

            // --- Codes ---
            models::codes::CodeKind,
            models::codes::RedemptionCode,
            models::codes::CodePair,
            models::codes::RedemptionOutcome,
            models::codes::RedeemCodePayload,
            models::codes::CreateCodePairPayload,
            models::codes::SetActivePayload,

            // --- Licenses ---
            models::licenses::SubscriptionStatus,
            models::licenses::LicenseGrant,
            models::licenses::OrganizationLicense,
            models::licenses::TeamLicense,
            models::licenses::TeamProvisionStatus,
            models::licenses::TeamProvisionResult,
            models::licenses::OrganizationProvisioning,
            models::licenses::CreateOrganizationPayload,

            // --- Finder Fees ---
            models::finder_fees::FinderFeeStatus,
            models::finder_fees::ReferralPartner,
            models::finder_fees::FinderFeeRecord,
            models::finder_fees::PartnerEarnings,
            models::finder_fees::CreatePartnerPayload,
            models::finder_fees::CreateFinderFeePayload,
            models::finder_fees::UpdateFinderFeeStatusPayload,

            // --- Promo Codes ---
            models::promos::PromoCode,
            models::promos::PromoRedemption,
            models::promos::PromoValidation,
            models::promos::CreatePromoPayload,

            // --- Trials ---
            models::trials::TrialStatus,
            models::trials::TrialGrant,
            models::trials::CreateTrialPayload,
            models::trials::ExtendTrialPayload,

            // --- Pricing / Compras ---
            models::pricing::SeatQuote,
            models::purchases::ProvisionedLicense,
            models::purchases::PurchaseOutcome,
            models::purchases::PurchaseHandling,
            models::purchases::WebhookOutcome,
        )
    ),
    tags(
        (name = "Health", description = "Estado do serviço"),
        (name = "Auth", description = "Login do painel administrativo"),
        (name = "Pricing", description = "Tabela de preço por assento"),
        (name = "Codes", description = "Códigos de resgate (treinador e equipe)"),
        (name = "Organizations", description = "Organizações e licenças das equipes"),
        (name = "Finder Fees", description = "Parceiros de indicação e comissões"),
        (name = "Promo Codes", description = "Códigos promocionais do checkout"),
        (name = "Trials", description = "Períodos de teste"),
        (name = "Webhooks", description = "Eventos de pagamento do Stripe")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_admin_route_is_documented_with_the_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/admin/codes/pairs"));
        assert!(doc.paths.paths.contains_key("/api/webhooks/stripe"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
