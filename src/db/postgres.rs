// src/db/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        license_repo::GrantInsert, CodeRepository, FinderFeeRepository, LedgerStore,
        LicenseRepository, PromoRepository, TrialRepository,
    },
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

/// Store durável: cada operação de várias linhas abre a sua própria transação.
/// Se algo falhar no meio, o drop da transação faz o rollback (sem deletes manuais).
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    codes: CodeRepository,
    licenses: LicenseRepository,
    finder_fees: FinderFeeRepository,
    promos: PromoRepository,
    trials: TrialRepository,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            codes: CodeRepository::new(pool.clone()),
            licenses: LicenseRepository::new(pool.clone()),
            finder_fees: FinderFeeRepository::new(pool.clone()),
            promos: PromoRepository::new(pool.clone()),
            trials: TrialRepository::new(pool.clone()),
            pool,
        }
    }

    /// Insere o par dentro de uma transação já aberta.
    async fn insert_pair_in(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        coach: &NewCode,
        member: &NewCode,
    ) -> Result<CodePair, AppError> {
        let coach_row = self.codes.insert(&mut **tx, coach, None).await?;
        let member_row = self.codes.insert(&mut **tx, member, Some(coach_row.id)).await?;
        let coach_row = self.codes.link(&mut **tx, coach_row.id, member_row.id).await?;

        Ok(CodePair {
            coach: coach_row,
            member: member_row,
        })
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        self.codes.exists(code).await
    }

    async fn insert_code_pair(&self, coach: NewCode, member: NewCode) -> Result<CodePair, AppError> {
        let mut tx = self.pool.begin().await?;
        let pair = self.insert_pair_in(&mut tx, &coach, &member).await?;
        tx.commit().await?;
        Ok(pair)
    }

    async fn find_code(&self, code: &str) -> Result<Option<RedemptionCode>, AppError> {
        self.codes.find_by_code(&self.pool, code).await
    }

    async fn redeem_code(&self, code: &str) -> Result<RedeemAttempt, AppError> {
        if let Some(redeemed) = self.codes.try_increment(&self.pool, code).await? {
            return Ok(RedeemAttempt::Redeemed(redeemed));
        }

        // O UPDATE não pegou nenhuma linha: descobre o motivo sem alterar nada.
        match self.codes.find_by_code(&self.pool, code).await? {
            Some(existing) if existing.is_active => Ok(RedeemAttempt::AtCapacity(existing)),
            _ => Ok(RedeemAttempt::Missing),
        }
    }

    async fn set_code_active(&self, id: Uuid, is_active: bool) -> Result<RedemptionCode, AppError> {
        self.codes
            .set_active(&self.pool, id, is_active)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Código {}", id)))
    }

    async fn list_codes(&self, filter: &CodeFilter) -> Result<Vec<RedemptionCode>, AppError> {
        self.codes.list(filter).await
    }

    async fn purchase_processed(&self, session_id: &str) -> Result<bool, AppError> {
        self.licenses.session_exists(session_id).await
    }

    async fn create_organization(
        &self,
        organization: NewOrganization,
    ) -> Result<OrganizationLicense, AppError> {
        self.licenses
            .create_organization(&self.pool, &organization)
            .await
    }

    async fn provision_team(&self, team: NewTeamLicense) -> Result<TeamLicense, AppError> {
        let mut tx = self.pool.begin().await?;

        let pair = self.insert_pair_in(&mut tx, &team.coach, &team.member).await?;

        let grant_id = self
            .licenses
            .insert_grant(
                &mut *tx,
                &GrantInsert {
                    organization_id: team.organization_id,
                    team_name: &team.team_name,
                    payer_email: &team.payer_email,
                    coach_code_id: pair.coach.id,
                    member_code_id: pair.member.id,
                    seat_total: team.seat_total(),
                    discount_percentage: team.discount_percentage,
                    price_per_seat: team.price_per_seat,
                    amount_paid: team.amount_paid,
                    stripe_session_id: team.stripe_session_id.as_deref(),
                    stripe_subscription_id: team.stripe_subscription_id.as_deref(),
                },
            )
            .await?;

        let grant = self
            .licenses
            .find_grant(&mut *tx, grant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Licença {}", grant_id)))?;

        tx.commit().await?;

        Ok(TeamLicense {
            grant,
            coach_code: pair.coach.code,
            member_code: pair.member.code,
        })
    }

    async fn find_grant(&self, id: Uuid) -> Result<Option<LicenseGrant>, AppError> {
        self.licenses.find_grant(&self.pool, id).await
    }

    async fn list_organization_grants(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<LicenseGrant>, AppError> {
        self.licenses.list_by_organization(organization_id).await
    }

    async fn set_subscription_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<u64, AppError> {
        self.licenses
            .set_status_by_subscription(&self.pool, stripe_subscription_id, status)
            .await
    }

    async fn find_partner(&self, finder_code: &str) -> Result<Option<ReferralPartner>, AppError> {
        self.finder_fees.find_partner(finder_code).await
    }

    async fn create_partner(&self, partner: NewReferralPartner) -> Result<ReferralPartner, AppError> {
        self.finder_fees.create_partner(&self.pool, &partner).await
    }

    async fn list_partners(&self) -> Result<Vec<ReferralPartner>, AppError> {
        self.finder_fees.list_partners().await
    }

    async fn count_finder_fees_for_party(
        &self,
        finder_code: &str,
        referred_party: &str,
    ) -> Result<i64, AppError> {
        self.finder_fees
            .count_for_party(finder_code, referred_party)
            .await
    }

    async fn insert_finder_fee(&self, fee: NewFinderFee) -> Result<FinderFeeRecord, AppError> {
        self.finder_fees.insert(&self.pool, &fee).await
    }

    async fn find_finder_fee(&self, id: Uuid) -> Result<Option<FinderFeeRecord>, AppError> {
        self.finder_fees.find(id).await
    }

    async fn transition_finder_fee(
        &self,
        id: Uuid,
        from: FinderFeeStatus,
        to: FinderFeeStatus,
    ) -> Result<Option<FinderFeeRecord>, AppError> {
        self.finder_fees
            .transition_status(&self.pool, id, from, to)
            .await
    }

    async fn list_finder_fees(&self, filter: &FinderFeeFilter) -> Result<Vec<FinderFeeRecord>, AppError> {
        self.finder_fees.list(filter).await
    }

    async fn list_partner_fees(&self, finder_code: &str) -> Result<Vec<FinderFeeRecord>, AppError> {
        self.finder_fees.list_for_partner(finder_code).await
    }

    async fn find_promo(&self, code: &str) -> Result<Option<PromoCode>, AppError> {
        self.promos.find_by_code(code).await
    }

    async fn create_promo(&self, promo: NewPromoCode) -> Result<PromoCode, AppError> {
        self.promos.create(&self.pool, &promo).await
    }

    async fn list_promos(&self) -> Result<Vec<PromoCode>, AppError> {
        self.promos.list().await
    }

    async fn set_promo_active(&self, id: Uuid, is_active: bool) -> Result<PromoCode, AppError> {
        self.promos
            .set_active(&self.pool, id, is_active)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promo code {}", id)))
    }

    async fn record_promo_redemption(
        &self,
        redemption: NewPromoRedemption,
    ) -> Result<PromoRedemption, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = self.promos.insert_redemption(&mut *tx, &redemption).await?;
        let updated = self
            .promos
            .increment_redemptions(&mut *tx, redemption.promo_code_id)
            .await?;
        if updated == 0 {
            return Err(AppError::NotFound(format!(
                "Promo code {}",
                redemption.promo_code_id
            )));
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn create_trial(&self, trial: NewTrialGrant) -> Result<TrialGrant, AppError> {
        self.trials.create(&self.pool, &trial).await
    }

    async fn find_trial(&self, id: Uuid) -> Result<Option<TrialGrant>, AppError> {
        self.trials.find(id).await
    }

    async fn update_trial(
        &self,
        id: Uuid,
        ends_at: DateTime<Utc>,
        status: TrialStatus,
    ) -> Result<TrialGrant, AppError> {
        self.trials
            .update(&self.pool, id, ends_at, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trial {}", id)))
    }

    async fn list_trials(&self) -> Result<Vec<TrialGrant>, AppError> {
        self.trials.list().await
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
