// src/db/store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        codes::{CodeFilter, CodePair, NewCode, RedeemAttempt, RedemptionCode},
        finder_fees::{
            FinderFeeFilter, FinderFeeRecord, FinderFeeStatus, NewFinderFee, NewReferralPartner,
            ReferralPartner,
        },
        licenses::{
            LicenseGrant, NewOrganization, NewTeamLicense, OrganizationLicense, SubscriptionStatus,
            TeamLicense,
        },
        promos::{NewPromoCode, NewPromoRedemption, PromoCode, PromoRedemption},
        trials::{NewTrialGrant, TrialGrant, TrialStatus},
    },
};

/// Persistência do ledger. Cada método é uma operação lógica: quando grava
/// mais de uma linha, grava tudo ou nada.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // --- Códigos de resgate ---
    async fn code_exists(&self, code: &str) -> Result<bool, AppError>;
    /// Grava os dois códigos e o vínculo bidirecional numa transação.
    async fn insert_code_pair(&self, coach: NewCode, member: NewCode) -> Result<CodePair, AppError>;
    async fn find_code(&self, code: &str) -> Result<Option<RedemptionCode>, AppError>;
    /// Incremento condicional: nunca passa de `max_uses`.
    async fn redeem_code(&self, code: &str) -> Result<RedeemAttempt, AppError>;
    async fn set_code_active(&self, id: Uuid, is_active: bool) -> Result<RedemptionCode, AppError>;
    async fn list_codes(&self, filter: &CodeFilter) -> Result<Vec<RedemptionCode>, AppError>;

    // --- Licenças ---
    async fn purchase_processed(&self, session_id: &str) -> Result<bool, AppError>;
    async fn create_organization(
        &self,
        organization: NewOrganization,
    ) -> Result<OrganizationLicense, AppError>;
    /// Par de códigos + licença da equipe numa transação.
    async fn provision_team(&self, team: NewTeamLicense) -> Result<TeamLicense, AppError>;
    async fn find_grant(&self, id: Uuid) -> Result<Option<LicenseGrant>, AppError>;
    async fn list_organization_grants(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<LicenseGrant>, AppError>;
    async fn set_subscription_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<u64, AppError>;

    // --- Parceiros e finder fees ---
    async fn find_partner(&self, finder_code: &str) -> Result<Option<ReferralPartner>, AppError>;
    async fn create_partner(&self, partner: NewReferralPartner) -> Result<ReferralPartner, AppError>;
    async fn list_partners(&self) -> Result<Vec<ReferralPartner>, AppError>;
    async fn count_finder_fees_for_party(
        &self,
        finder_code: &str,
        referred_party: &str,
    ) -> Result<i64, AppError>;
    async fn insert_finder_fee(&self, fee: NewFinderFee) -> Result<FinderFeeRecord, AppError>;
    async fn find_finder_fee(&self, id: Uuid) -> Result<Option<FinderFeeRecord>, AppError>;
    /// Só troca o status se ele ainda for `from`; None caso contrário.
    async fn transition_finder_fee(
        &self,
        id: Uuid,
        from: FinderFeeStatus,
        to: FinderFeeStatus,
    ) -> Result<Option<FinderFeeRecord>, AppError>;
    async fn list_finder_fees(&self, filter: &FinderFeeFilter) -> Result<Vec<FinderFeeRecord>, AppError>;
    async fn list_partner_fees(&self, finder_code: &str) -> Result<Vec<FinderFeeRecord>, AppError>;

    // --- Promo codes ---
    async fn find_promo(&self, code: &str) -> Result<Option<PromoCode>, AppError>;
    async fn create_promo(&self, promo: NewPromoCode) -> Result<PromoCode, AppError>;
    async fn list_promos(&self) -> Result<Vec<PromoCode>, AppError>;
    async fn set_promo_active(&self, id: Uuid, is_active: bool) -> Result<PromoCode, AppError>;
    /// Registro + incremento atômico do contador, na mesma transação.
    async fn record_promo_redemption(
        &self,
        redemption: NewPromoRedemption,
    ) -> Result<PromoRedemption, AppError>;

    // --- Trials ---
    async fn create_trial(&self, trial: NewTrialGrant) -> Result<TrialGrant, AppError>;
    async fn find_trial(&self, id: Uuid) -> Result<Option<TrialGrant>, AppError>;
    async fn update_trial(
        &self,
        id: Uuid,
        ends_at: DateTime<Utc>,
        status: TrialStatus,
    ) -> Result<TrialGrant, AppError>;
    async fn list_trials(&self) -> Result<Vec<TrialGrant>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
    fn backend_name(&self) -> &'static str;
}
