//! Store em memória do ledger.
//!
//! Usado em desenvolvimento local (`STORE_BACKEND=memory`) e nos testes.
//! Nada é durável: o estado some quando o processo termina. Toda operação
//! roda sob um único `Mutex`, então as operações de várias linhas são
//! atômicas dentro do processo e o resgate nunca passa da capacidade.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::{
        codes::{CodeFilter, CodeKind, CodePair, NewCode, RedeemAttempt, RedemptionCode},
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

// Falhas injetáveis para exercitar rollback e o "continua no erro" do fan-out.
#[derive(Debug, Default)]
struct Faults {
    fail_member_insert: bool,
    fail_team_names: HashSet<String>,
    fail_promo_redemptions: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    codes: HashMap<Uuid, RedemptionCode>,
    organizations: HashMap<Uuid, OrganizationLicense>,
    grants: HashMap<Uuid, LicenseGrant>,
    partners: HashMap<String, ReferralPartner>,
    finder_fees: Vec<FinderFeeRecord>,
    promos: HashMap<Uuid, PromoCode>,
    promo_redemptions: Vec<PromoRedemption>,
    trials: HashMap<Uuid, TrialGrant>,
    faults: Faults,
}

impl MemoryState {
    fn code_by_value(&self, code: &str) -> Option<&RedemptionCode> {
        self.codes.values().find(|c| c.code == code)
    }

    fn build_code(new_code: &NewCode, linked_code_id: Option<Uuid>) -> RedemptionCode {
        let now = Utc::now();
        RedemptionCode {
            id: Uuid::new_v4(),
            code: new_code.code.clone(),
            kind: new_code.kind,
            max_uses: new_code.max_uses,
            uses_count: 0,
            linked_code_id,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Monta o par sem tocar no estado; só grava se as duas partes forem válidas.
    fn stage_pair(&self, coach: &NewCode, member: &NewCode) -> Result<CodePair, AppError> {
        for candidate in [coach, member] {
            if self.code_by_value(&candidate.code).is_some() {
                return Err(AppError::AlreadyExists(format!("Código {}", candidate.code)));
            }
        }
        if coach.code == member.code {
            return Err(AppError::AlreadyExists(format!("Código {}", member.code)));
        }
        if self.faults.fail_member_insert {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "falha simulada ao inserir o código de equipe"
            )));
        }

        let mut coach_row = Self::build_code(coach, None);
        let member_row = Self::build_code(member, Some(coach_row.id));
        coach_row.linked_code_id = Some(member_row.id);

        Ok(CodePair {
            coach: coach_row,
            member: member_row,
        })
    }

    fn commit_pair(&mut self, pair: &CodePair) {
        self.codes.insert(pair.coach.id, pair.coach.clone());
        self.codes.insert(pair.member.id, pair.member.clone());
    }

    /// `seats_consumed` acompanha o `uses_count` do código de equipe.
    fn with_consumption(&self, grant: &LicenseGrant) -> LicenseGrant {
        let mut grant = grant.clone();
        grant.seats_consumed = self
            .codes
            .get(&grant.member_code_id)
            .map(|c| c.uses_count)
            .unwrap_or_default();
        grant
    }
}

#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryLedgerStore {
    pub async fn fail_member_inserts(&self, fail: bool) {
        self.state.lock().await.faults.fail_member_insert = fail;
    }

    pub async fn fail_team(&self, team_name: &str) {
        self.state
            .lock()
            .await
            .faults
            .fail_team_names
            .insert(team_name.to_string());
    }

    pub async fn fail_promo_redemptions(&self, fail: bool) {
        self.state.lock().await.faults.fail_promo_redemptions = fail;
    }

    pub async fn code_count(&self) -> usize {
        self.state.lock().await.codes.len()
    }

    pub async fn grant_count(&self) -> usize {
        self.state.lock().await.grants.len()
    }

    pub async fn finder_fee_count(&self) -> usize {
        self.state.lock().await.finder_fees.len()
    }

    pub async fn promo_redemption_count(&self) -> usize {
        self.state.lock().await.promo_redemptions.len()
    }

    /// Insere um código avulso, como se já existisse no banco.
    pub async fn seed_code(&self, code: &str, kind: CodeKind, max_uses: i32) -> RedemptionCode {
        let row = MemoryState::build_code(
            &NewCode {
                code: code.to_string(),
                kind,
                max_uses,
            },
            None,
        );
        self.state.lock().await.codes.insert(row.id, row.clone());
        row
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.state.lock().await.code_by_value(code).is_some())
    }

    async fn insert_code_pair(&self, coach: NewCode, member: NewCode) -> Result<CodePair, AppError> {
        let mut state = self.state.lock().await;
        let pair = state.stage_pair(&coach, &member)?;
        state.commit_pair(&pair);
        Ok(pair)
    }

    async fn find_code(&self, code: &str) -> Result<Option<RedemptionCode>, AppError> {
        Ok(self.state.lock().await.code_by_value(code).cloned())
    }

    async fn redeem_code(&self, code: &str) -> Result<RedeemAttempt, AppError> {
        let mut state = self.state.lock().await;
        let Some(row) = state.codes.values_mut().find(|c| c.code == code) else {
            return Ok(RedeemAttempt::Missing);
        };
        if !row.is_active {
            return Ok(RedeemAttempt::Missing);
        }
        if row.uses_count >= row.max_uses {
            return Ok(RedeemAttempt::AtCapacity(row.clone()));
        }
        row.uses_count += 1;
        row.updated_at = Utc::now();
        Ok(RedeemAttempt::Redeemed(row.clone()))
    }

    async fn set_code_active(&self, id: Uuid, is_active: bool) -> Result<RedemptionCode, AppError> {
        let mut state = self.state.lock().await;
        let row = state
            .codes
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Código {}", id)))?;
        row.is_active = is_active;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn list_codes(&self, filter: &CodeFilter) -> Result<Vec<RedemptionCode>, AppError> {
        let state = self.state.lock().await;
        let mut codes: Vec<RedemptionCode> = state
            .codes
            .values()
            .filter(|c| filter.kind.is_none_or(|k| c.kind == k))
            .filter(|c| filter.is_active.is_none_or(|a| c.is_active == a))
            .cloned()
            .collect();
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(codes)
    }

    async fn purchase_processed(&self, session_id: &str) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        let in_grants = state
            .grants
            .values()
            .any(|g| g.stripe_session_id.as_deref() == Some(session_id));
        let in_orgs = state
            .organizations
            .values()
            .any(|o| o.stripe_session_id.as_deref() == Some(session_id));
        Ok(in_grants || in_orgs)
    }

    async fn create_organization(
        &self,
        organization: NewOrganization,
    ) -> Result<OrganizationLicense, AppError> {
        let mut state = self.state.lock().await;
        if let Some(session) = organization.stripe_session_id.as_deref() {
            if state
                .organizations
                .values()
                .any(|o| o.stripe_session_id.as_deref() == Some(session))
            {
                return Err(AppError::AlreadyExists("Sessão de compra".into()));
            }
        }
        let row = OrganizationLicense {
            id: Uuid::new_v4(),
            organization_name: organization.organization_name,
            payer_email: organization.payer_email,
            total_seats: organization.total_seats,
            number_of_teams: organization.number_of_teams,
            amount_paid: organization.amount_paid,
            stripe_session_id: organization.stripe_session_id,
            created_at: Utc::now(),
        };
        state.organizations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn provision_team(&self, team: NewTeamLicense) -> Result<TeamLicense, AppError> {
        let mut state = self.state.lock().await;

        if state.faults.fail_team_names.contains(&team.team_name) {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "falha simulada ao provisionar {}",
                team.team_name
            )));
        }

        let pair = state.stage_pair(&team.coach, &team.member)?;
        let now = Utc::now();
        let grant = LicenseGrant {
            id: Uuid::new_v4(),
            organization_id: team.organization_id,
            team_name: team.team_name.clone(),
            payer_email: team.payer_email.clone(),
            coach_code_id: pair.coach.id,
            member_code_id: pair.member.id,
            seat_total: team.seat_total(),
            seats_consumed: 0,
            discount_percentage: team.discount_percentage,
            price_per_seat: team.price_per_seat,
            amount_paid: team.amount_paid,
            subscription_status: SubscriptionStatus::Active,
            stripe_session_id: team.stripe_session_id.clone(),
            stripe_subscription_id: team.stripe_subscription_id.clone(),
            created_at: now,
            updated_at: now,
        };

        state.commit_pair(&pair);
        state.grants.insert(grant.id, grant.clone());

        Ok(TeamLicense {
            grant,
            coach_code: pair.coach.code,
            member_code: pair.member.code,
        })
    }

    async fn find_grant(&self, id: Uuid) -> Result<Option<LicenseGrant>, AppError> {
        let state = self.state.lock().await;
        Ok(state.grants.get(&id).map(|g| state.with_consumption(g)))
    }

    async fn list_organization_grants(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<LicenseGrant>, AppError> {
        let state = self.state.lock().await;
        let mut grants: Vec<LicenseGrant> = state
            .grants
            .values()
            .filter(|g| g.organization_id == Some(organization_id))
            .map(|g| state.with_consumption(g))
            .collect();
        grants.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.team_name.cmp(&b.team_name)));
        Ok(grants)
    }

    async fn set_subscription_status(
        &self,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for grant in state
            .grants
            .values_mut()
            .filter(|g| g.stripe_subscription_id.as_deref() == Some(stripe_subscription_id))
        {
            grant.subscription_status = status;
            grant.updated_at = Utc::now();
            updated += 1;
        }
        Ok(updated)
    }

    async fn find_partner(&self, finder_code: &str) -> Result<Option<ReferralPartner>, AppError> {
        Ok(self.state.lock().await.partners.get(finder_code).cloned())
    }

    async fn create_partner(&self, partner: NewReferralPartner) -> Result<ReferralPartner, AppError> {
        let mut state = self.state.lock().await;
        if state.partners.contains_key(&partner.finder_code) {
            return Err(AppError::AlreadyExists(format!(
                "Parceiro {}",
                partner.finder_code
            )));
        }
        let row = ReferralPartner {
            id: Uuid::new_v4(),
            finder_code: partner.finder_code,
            name: partner.name,
            email: partner.email,
            is_recurring: partner.is_recurring,
            is_active: true,
            created_at: Utc::now(),
        };
        state.partners.insert(row.finder_code.clone(), row.clone());
        Ok(row)
    }

    async fn list_partners(&self) -> Result<Vec<ReferralPartner>, AppError> {
        let mut partners: Vec<ReferralPartner> =
            self.state.lock().await.partners.values().cloned().collect();
        partners.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(partners)
    }

    async fn count_finder_fees_for_party(
        &self,
        finder_code: &str,
        referred_party: &str,
    ) -> Result<i64, AppError> {
        let state = self.state.lock().await;
        let count = state
            .finder_fees
            .iter()
            .filter(|f| f.finder_code == finder_code && f.referred_party == referred_party)
            .count();
        Ok(count as i64)
    }

    async fn insert_finder_fee(&self, fee: NewFinderFee) -> Result<FinderFeeRecord, AppError> {
        let mut state = self.state.lock().await;
        if !state.partners.contains_key(&fee.finder_code) {
            return Err(AppError::NotFound(format!("Parceiro {}", fee.finder_code)));
        }
        let now = Utc::now();
        let row = FinderFeeRecord {
            id: Uuid::new_v4(),
            finder_code: fee.finder_code,
            referred_party: fee.referred_party,
            purchase_amount: fee.purchase_amount,
            seat_count: fee.seat_count,
            fee_percentage: fee.fee_percentage,
            fee_amount: fee.fee_amount,
            is_first_purchase: fee.is_first_purchase,
            is_recurring_partner: fee.is_recurring_partner,
            status: FinderFeeStatus::Pending,
            stripe_session_id: fee.stripe_session_id,
            notes: fee.notes,
            created_at: now,
            updated_at: now,
        };
        state.finder_fees.push(row.clone());
        Ok(row)
    }

    async fn find_finder_fee(&self, id: Uuid) -> Result<Option<FinderFeeRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state.finder_fees.iter().find(|f| f.id == id).cloned())
    }

    async fn transition_finder_fee(
        &self,
        id: Uuid,
        from: FinderFeeStatus,
        to: FinderFeeStatus,
    ) -> Result<Option<FinderFeeRecord>, AppError> {
        let mut state = self.state.lock().await;
        let Some(row) = state
            .finder_fees
            .iter_mut()
            .find(|f| f.id == id && f.status == from)
        else {
            return Ok(None);
        };
        row.status = to;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn list_finder_fees(&self, filter: &FinderFeeFilter) -> Result<Vec<FinderFeeRecord>, AppError> {
        let state = self.state.lock().await;
        let mut fees: Vec<FinderFeeRecord> = state
            .finder_fees
            .iter()
            .filter(|f| filter.status.is_none_or(|s| f.status == s))
            .cloned()
            .collect();
        fees.reverse();
        Ok(fees)
    }

    async fn list_partner_fees(&self, finder_code: &str) -> Result<Vec<FinderFeeRecord>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .finder_fees
            .iter()
            .filter(|f| f.finder_code == finder_code)
            .cloned()
            .collect())
    }

    async fn find_promo(&self, code: &str) -> Result<Option<PromoCode>, AppError> {
        let state = self.state.lock().await;
        Ok(state.promos.values().find(|p| p.code == code).cloned())
    }

    async fn create_promo(&self, promo: NewPromoCode) -> Result<PromoCode, AppError> {
        let mut state = self.state.lock().await;
        if state.promos.values().any(|p| p.code == promo.code) {
            return Err(AppError::AlreadyExists(format!("Promo code {}", promo.code)));
        }
        let row = PromoCode {
            id: Uuid::new_v4(),
            code: promo.code,
            discount_percentage: promo.discount_percentage,
            max_redemptions: promo.max_redemptions,
            redemptions_count: 0,
            is_active: true,
            expires_at: promo.expires_at,
            created_at: Utc::now(),
        };
        state.promos.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_promos(&self) -> Result<Vec<PromoCode>, AppError> {
        let mut promos: Vec<PromoCode> = self.state.lock().await.promos.values().cloned().collect();
        promos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(promos)
    }

    async fn set_promo_active(&self, id: Uuid, is_active: bool) -> Result<PromoCode, AppError> {
        let mut state = self.state.lock().await;
        let row = state
            .promos
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Promo code {}", id)))?;
        row.is_active = is_active;
        Ok(row.clone())
    }

    async fn record_promo_redemption(
        &self,
        redemption: NewPromoRedemption,
    ) -> Result<PromoRedemption, AppError> {
        let mut state = self.state.lock().await;
        if state.faults.fail_promo_redemptions {
            return Err(AppError::InternalServerError(anyhow::anyhow!(
                "falha simulada ao registrar promo"
            )));
        }
        let promo = state
            .promos
            .get_mut(&redemption.promo_code_id)
            .ok_or_else(|| AppError::NotFound(format!("Promo code {}", redemption.promo_code_id)))?;
        promo.redemptions_count += 1;

        let row = PromoRedemption {
            id: Uuid::new_v4(),
            promo_code_id: redemption.promo_code_id,
            referred_party: redemption.referred_party,
            discount_applied: redemption.discount_applied.max(Decimal::ZERO),
            purchase_session_id: redemption.purchase_session_id,
            created_at: Utc::now(),
        };
        state.promo_redemptions.push(row.clone());
        Ok(row)
    }

    async fn create_trial(&self, trial: NewTrialGrant) -> Result<TrialGrant, AppError> {
        let now = Utc::now();
        let row = TrialGrant {
            id: Uuid::new_v4(),
            user_email: trial.user_email,
            starts_at: now,
            ends_at: trial.ends_at,
            status: TrialStatus::Active,
            notes: trial.notes,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.trials.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_trial(&self, id: Uuid) -> Result<Option<TrialGrant>, AppError> {
        Ok(self.state.lock().await.trials.get(&id).cloned())
    }

    async fn update_trial(
        &self,
        id: Uuid,
        ends_at: DateTime<Utc>,
        status: TrialStatus,
    ) -> Result<TrialGrant, AppError> {
        let mut state = self.state.lock().await;
        let row = state
            .trials
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Trial {}", id)))?;
        row.ends_at = ends_at;
        row.status = status;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn list_trials(&self) -> Result<Vec<TrialGrant>, AppError> {
        let mut trials: Vec<TrialGrant> = self.state.lock().await.trials.values().cloned().collect();
        trials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trials)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
