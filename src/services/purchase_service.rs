// src/services/purchase_service.rs
//
// Fluxo de compra confirmada: provisiona as licenças, faz a contabilidade de
// promo e finder fee e, só depois de tudo gravado, envia os e-mails.

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::LedgerStore,
    models::{
        finder_fees::ReferralPartner,
        licenses::{OrganizationOrder, SubscriptionStatus, TeamOrder},
        purchases::{
            ProvisionedLicense, PurchaseConfirmed, PurchaseHandling, PurchaseOutcome,
            WebhookOutcome,
        },
    },
    services::{
        email_service::{partner_notification, purchase_confirmation, EmailService},
        finder_fee_service::{FeeRecording, FinderFeeService, ReferredPurchase},
        organization_service::OrganizationService,
        promo_service::PromoService,
        stripe::StripeEvent,
    },
};

#[derive(Clone)]
pub struct PurchaseService {
    store: Arc<dyn LedgerStore>,
    organizations: OrganizationService,
    promos: PromoService,
    finder_fees: FinderFeeService,
    email: EmailService,
}

impl PurchaseService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        organizations: OrganizationService,
        promos: PromoService,
        finder_fees: FinderFeeService,
        email: EmailService,
    ) -> Self {
        Self {
            store,
            organizations,
            promos,
            finder_fees,
            email,
        }
    }

    pub async fn handle_event(&self, event: StripeEvent) -> Result<WebhookOutcome, AppError> {
        match event {
            StripeEvent::CheckoutCompleted(purchase) => {
                Ok(WebhookOutcome::Purchase(self.handle_purchase(purchase).await?))
            }
            StripeEvent::SubscriptionChanged {
                subscription_id,
                status,
            } => {
                let grants_updated = self.sync_subscription(&subscription_id, status).await?;
                Ok(WebhookOutcome::SubscriptionSynced {
                    subscription_id,
                    grants_updated,
                })
            }
            StripeEvent::Ignored { event_type } => {
                tracing::info!(event_type = %event_type, "Evento do Stripe ignorado");
                Ok(WebhookOutcome::Ignored { event_type })
            }
        }
    }

    pub async fn sync_subscription(
        &self,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<u64, AppError> {
        let updated = self
            .store
            .set_subscription_status(subscription_id, status)
            .await?;
        if updated == 0 {
            tracing::warn!(subscription_id, "Nenhuma licença ligada a esta assinatura");
        } else {
            tracing::info!(subscription_id, status = ?status, updated, "Status da assinatura sincronizado");
        }
        Ok(updated)
    }

    async fn provision(&self, purchase: &PurchaseConfirmed) -> Result<ProvisionedLicense, AppError> {
        match &purchase.organization {
            Some(org) => {
                let provisioning = self
                    .organizations
                    .provision_organization(OrganizationOrder {
                        organization_name: org.organization_name.clone(),
                        payer_email: purchase.payer_email.clone(),
                        total_seats: purchase.seat_count,
                        number_of_teams: org.number_of_teams,
                        seats_per_team: org.seats_per_team.clone(),
                        discount_percentage: purchase.discount_percentage,
                        price_per_seat: purchase.price_per_seat,
                        amount_paid: purchase.amount_paid,
                        stripe_session_id: Some(purchase.session_id.clone()),
                        stripe_subscription_id: purchase.subscription_id.clone(),
                    })
                    .await?;
                Ok(ProvisionedLicense::Organization(provisioning))
            }
            None => {
                let team = self
                    .organizations
                    .provision_single_team(TeamOrder {
                        team_name: purchase
                            .team_name
                            .clone()
                            .unwrap_or_else(|| purchase.payer_email.clone()),
                        payer_email: purchase.payer_email.clone(),
                        seat_count: purchase.seat_count,
                        discount_percentage: purchase.discount_percentage,
                        price_per_seat: purchase.price_per_seat,
                        amount_paid: purchase.amount_paid,
                        stripe_session_id: Some(purchase.session_id.clone()),
                        stripe_subscription_id: purchase.subscription_id.clone(),
                    })
                    .await?;
                Ok(ProvisionedLicense::Team(team))
            }
        }
    }

    pub async fn handle_purchase(
        &self,
        purchase: PurchaseConfirmed,
    ) -> Result<PurchaseHandling, AppError> {
        if purchase.seat_count < 1 {
            return Err(AppError::InvalidInput(
                "A compra precisa de pelo menos um assento.".into(),
            ));
        }
        if purchase.amount_paid <= rust_decimal::Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "O valor pago deve ser positivo.".into(),
            ));
        }

        // Única proteção de idempotência: a sessão já gerou licenças?
        if self.store.purchase_processed(&purchase.session_id).await? {
            tracing::info!(session_id = %purchase.session_id, "Compra já processada, ignorando");
            return Ok(PurchaseHandling::AlreadyProcessed {
                session_id: purchase.session_id,
            });
        }

        let license = match self.provision(&purchase).await {
            Ok(license) => license,
            // Outra entrega do mesmo evento chegou primeiro
            Err(AppError::AlreadyExists(what)) => {
                tracing::info!(session_id = %purchase.session_id, what = %what, "Compra concorrente já processada");
                return Ok(PurchaseHandling::AlreadyProcessed {
                    session_id: purchase.session_id,
                });
            }
            Err(e) => return Err(e),
        };

        let mut warnings = Vec::new();

        let promo_redemption = match &purchase.promo_code {
            Some(code) => match self
                .promos
                .record_redemption(code, &purchase.payer_email, purchase.amount_paid, &purchase.session_id)
                .await
            {
                Ok(redemption) => redemption,
                Err(e) => {
                    tracing::error!(session_id = %purchase.session_id, code = %code, error = %e, "Falha ao registrar promo code");
                    warnings.push(format!("promo_code: {}", e));
                    None
                }
            },
            None => None,
        };

        let mut notify: Option<ReferralPartner> = None;
        let finder_fee = match &purchase.finder_code {
            Some(code) => match self
                .finder_fees
                .record_from_purchase(ReferredPurchase {
                    finder_code: code.clone(),
                    referred_party: purchase.payer_email.clone(),
                    purchase_amount: purchase.amount_paid,
                    seat_count: purchase.seat_count,
                    stripe_session_id: Some(purchase.session_id.clone()),
                    notes: None,
                })
                .await
            {
                Ok(FeeRecording::Recorded(fee, partner)) => {
                    notify = Some(partner);
                    Some(fee)
                }
                Ok(FeeRecording::Duplicate | FeeRecording::UnknownPartner) => None,
                Err(e) => {
                    tracing::error!(session_id = %purchase.session_id, finder_code = %code, error = %e, "Falha ao registrar finder fee");
                    warnings.push(format!("finder_fee: {}", e));
                    None
                }
            },
            None => None,
        };

        // Tudo gravado: agora os e-mails, sem derrubar a compra se falharem.
        let confirmation_sent = self
            .email
            .send_best_effort(purchase_confirmation(&purchase.payer_email, &license))
            .await;

        if let (Some(partner), Some(fee)) = (&notify, &finder_fee) {
            self.email
                .send_best_effort(partner_notification(&partner.email, fee))
                .await;
        }

        tracing::info!(
            session_id = %purchase.session_id,
            seats = purchase.seat_count,
            warnings = warnings.len(),
            "Compra processada"
        );

        Ok(PurchaseHandling::Processed(PurchaseOutcome {
            session_id: purchase.session_id,
            license,
            promo_redemption,
            finder_fee,
            confirmation_sent,
            warnings,
        }))
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::{
        db::MemoryLedgerStore,
        services::{
            code_generator::CodeGenerator, email_service::Mailer, ledger_service::LedgerService,
        },
    };

    /// Monta o fluxo completo sobre o store em memória.
    pub fn purchase_service(store: Arc<MemoryLedgerStore>, mailer: Arc<dyn Mailer>) -> PurchaseService {
        let ledger = LedgerService::new(store.clone(), CodeGenerator::seeded(99));
        PurchaseService::new(
            store.clone(),
            OrganizationService::new(store.clone(), ledger),
            PromoService::new(store.clone()),
            FinderFeeService::new(store),
            EmailService::new(mailer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::purchase_service, *};
    use crate::{
        db::MemoryLedgerStore,
        models::{
            finder_fees::{CreatePartnerPayload, FinderFeeStatus},
            promos::CreatePromoPayload,
            purchases::OrganizationPurchase,
        },
        services::email_service::testing::{FailingMailer, RecordingMailer},
    };
    use rust_decimal_macros::dec;

    fn purchase(session_id: &str) -> PurchaseConfirmed {
        PurchaseConfirmed {
            session_id: session_id.into(),
            payer_email: "director@club.org".into(),
            amount_paid: dec!(1200.00),
            seat_count: 12,
            discount_percentage: dec!(10),
            price_per_seat: dec!(100.00),
            team_name: Some("U12 Falcons".into()),
            organization: None,
            promo_code: None,
            finder_code: Some("ABC123".into()),
            subscription_id: Some("sub_1".into()),
        }
    }

    async fn partner(store: &Arc<MemoryLedgerStore>) {
        FinderFeeService::new(store.clone())
            .create_partner(CreatePartnerPayload {
                finder_code: "ABC123".into(),
                name: "Coach Rivera".into(),
                email: "rivera@example.com".into(),
                is_recurring: false,
            })
            .await
            .unwrap();
    }

    fn processed(handling: PurchaseHandling) -> PurchaseOutcome {
        match handling {
            PurchaseHandling::Processed(outcome) => outcome,
            other => panic!("esperava compra processada, veio {:?}", other),
        }
    }

    #[tokio::test]
    async fn twelve_seat_referral_purchase_end_to_end() {
        let store = Arc::new(MemoryLedgerStore::new());
        partner(&store).await;
        let mailer = Arc::new(RecordingMailer::default());
        let service = purchase_service(store.clone(), mailer.clone());

        let outcome = processed(service.handle_purchase(purchase("cs_1")).await.unwrap());

        let ProvisionedLicense::Team(team) = &outcome.license else {
            panic!("esperava equipe avulsa");
        };
        let member = store.find_code(&team.member_code).await.unwrap().unwrap();
        let coach = store.find_code(&team.coach_code).await.unwrap().unwrap();
        assert_eq!(member.max_uses, 12);
        assert_eq!(coach.max_uses, 1);
        assert_eq!(member.linked_code_id, Some(coach.id));

        let fee = outcome.finder_fee.clone().unwrap();
        assert_eq!(fee.fee_percentage, dec!(10));
        assert_eq!(fee.fee_amount, dec!(120.00));
        assert_eq!(fee.status, FinderFeeStatus::Pending);
        assert!(outcome.confirmation_sent);
        assert!(outcome.warnings.is_empty());

        let messages = mailer.messages().await;
        let to_payer: Vec<_> = messages.iter().filter(|m| m.to == "director@club.org").collect();
        assert_eq!(to_payer.len(), 1);
        assert!(to_payer[0].text.contains(&team.coach_code));
        assert!(to_payer[0].text.contains(&team.member_code));
        assert!(messages.iter().any(|m| m.to == "rivera@example.com"));

        // Segunda compra da mesma parte: nenhuma fee nova
        let second = processed(service.handle_purchase(purchase("cs_2")).await.unwrap());
        assert!(second.finder_fee.is_none());
        assert_eq!(store.finder_fee_count().await, 1);
    }

    #[tokio::test]
    async fn replayed_session_is_a_no_op() {
        let store = Arc::new(MemoryLedgerStore::new());
        partner(&store).await;
        let mailer = Arc::new(RecordingMailer::default());
        let service = purchase_service(store.clone(), mailer.clone());

        service.handle_purchase(purchase("cs_1")).await.unwrap();
        let replay = service.handle_purchase(purchase("cs_1")).await.unwrap();

        assert!(matches!(replay, PurchaseHandling::AlreadyProcessed { .. }));
        assert_eq!(store.grant_count().await, 1);
        assert_eq!(store.code_count().await, 2);
        assert_eq!(
            mailer.messages().await.iter().filter(|m| m.to == "director@club.org").count(),
            1
        );
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_the_purchase() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = purchase_service(store.clone(), Arc::new(FailingMailer));

        let outcome = processed(service.handle_purchase(purchase("cs_1")).await.unwrap());
        assert!(!outcome.confirmation_sent);
        assert_eq!(store.grant_count().await, 1);
    }

    #[tokio::test]
    async fn promo_bookkeeping_failure_is_reported_not_raised() {
        let store = Arc::new(MemoryLedgerStore::new());
        PromoService::new(store.clone())
            .create(CreatePromoPayload {
                code: "SPRING25".into(),
                discount_percentage: dec!(25),
                max_redemptions: None,
                expires_at: None,
            })
            .await
            .unwrap();
        store.fail_promo_redemptions(true).await;
        let service = purchase_service(store.clone(), Arc::new(RecordingMailer::default()));

        let mut p = purchase("cs_1");
        p.promo_code = Some("SPRING25".into());
        let outcome = processed(service.handle_purchase(p).await.unwrap());

        assert!(outcome.promo_redemption.is_none());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(store.grant_count().await, 1);
    }

    #[tokio::test]
    async fn promo_code_is_recorded_with_the_purchase() {
        let store = Arc::new(MemoryLedgerStore::new());
        PromoService::new(store.clone())
            .create(CreatePromoPayload {
                code: "SPRING25".into(),
                discount_percentage: dec!(25),
                max_redemptions: None,
                expires_at: None,
            })
            .await
            .unwrap();
        let service = purchase_service(store.clone(), Arc::new(RecordingMailer::default()));

        let mut p = purchase("cs_1");
        p.promo_code = Some("SPRING25".into());
        p.amount_paid = dec!(75.00);
        let outcome = processed(service.handle_purchase(p).await.unwrap());

        let redemption = outcome.promo_redemption.unwrap();
        assert_eq!(redemption.discount_applied, dec!(25.00));
        assert_eq!(redemption.purchase_session_id, "cs_1");
    }

    #[tokio::test]
    async fn organization_purchase_fans_out_into_teams() {
        let store = Arc::new(MemoryLedgerStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let service = purchase_service(store.clone(), mailer.clone());

        let mut p = purchase("cs_org");
        p.seat_count = 60;
        p.finder_code = None;
        p.organization = Some(OrganizationPurchase {
            organization_name: "Riverside".into(),
            number_of_teams: 3,
            seats_per_team: Some(vec![10, 20, 30]),
        });

        let outcome = processed(service.handle_purchase(p.clone()).await.unwrap());
        let ProvisionedLicense::Organization(org) = &outcome.license else {
            panic!("esperava organização");
        };
        assert_eq!(org.teams.len(), 3);
        assert_eq!(org.allocated_seats(), 60);
        assert_eq!(outcome.license.all_codes().len(), 3);

        let messages = mailer.messages().await;
        assert_eq!(messages.len(), 1);
        for (_, coach, member) in outcome.license.all_codes() {
            assert!(messages[0].text.contains(&coach));
            assert!(messages[0].text.contains(&member));
        }

        let replay = service.handle_purchase(p).await.unwrap();
        assert!(matches!(replay, PurchaseHandling::AlreadyProcessed { .. }));
    }

    #[tokio::test]
    async fn invalid_purchases_are_rejected_before_any_write() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = purchase_service(store.clone(), Arc::new(RecordingMailer::default()));

        let mut zero_seats = purchase("cs_1");
        zero_seats.seat_count = 0;
        assert!(matches!(
            service.handle_purchase(zero_seats).await,
            Err(AppError::InvalidInput(_))
        ));

        let mut free = purchase("cs_2");
        free.amount_paid = dec!(0);
        assert!(service.handle_purchase(free).await.is_err());
        assert_eq!(store.code_count().await, 0);
    }

    #[tokio::test]
    async fn subscription_changes_update_the_grants() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = purchase_service(store.clone(), Arc::new(RecordingMailer::default()));
        let outcome = processed(service.handle_purchase(purchase("cs_1")).await.unwrap());
        let ProvisionedLicense::Team(team) = outcome.license else {
            panic!("esperava equipe avulsa");
        };

        let result = service
            .handle_event(StripeEvent::SubscriptionChanged {
                subscription_id: "sub_1".into(),
                status: SubscriptionStatus::Cancelled,
            })
            .await
            .unwrap();
        assert!(matches!(
            result,
            WebhookOutcome::SubscriptionSynced { grants_updated: 1, .. }
        ));

        let grant = store.find_grant(team.grant.id).await.unwrap().unwrap();
        assert_eq!(grant.subscription_status, SubscriptionStatus::Cancelled);
    }
}
