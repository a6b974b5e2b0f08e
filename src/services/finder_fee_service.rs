// src/services/finder_fee_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        normalize::{normalize_code, normalize_email},
    },
    db::LedgerStore,
    models::finder_fees::{
        CreateFinderFeePayload, CreatePartnerPayload, FinderFeeFilter, FinderFeeRecord,
        FinderFeeStatus, NewFinderFee, NewReferralPartner, PartnerEarnings, ReferralPartner,
    },
    services::commission::{compute_fee, partner_volume_rate, percentage_of},
};

/// Dados da compra que geram (ou não) uma finder fee.
#[derive(Debug, Clone)]
pub struct ReferredPurchase {
    pub finder_code: String,
    pub referred_party: String,
    pub purchase_amount: Decimal,
    pub seat_count: i32,
    pub stripe_session_id: Option<String>,
    pub notes: Option<String>,
}

/// O que aconteceu com a indicação de uma compra.
#[derive(Debug, Clone)]
pub enum FeeRecording {
    Recorded(FinderFeeRecord, ReferralPartner),
    Duplicate,
    UnknownPartner,
}

#[derive(Clone)]
pub struct FinderFeeService {
    store: Arc<dyn LedgerStore>,
}

impl FinderFeeService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    async fn build_fee(
        &self,
        partner: &ReferralPartner,
        purchase: &ReferredPurchase,
    ) -> Result<Option<NewFinderFee>, AppError> {
        let previous = self
            .store
            .count_finder_fees_for_party(&partner.finder_code, &purchase.referred_party)
            .await?;

        // Parceiro não recorrente recebe uma vez só por parte indicada.
        if !partner.is_recurring && previous > 0 {
            return Ok(None);
        }

        let is_first_purchase = previous == 0;
        let (fee_percentage, fee_amount) =
            compute_fee(purchase.purchase_amount, partner.is_recurring, is_first_purchase);

        Ok(Some(NewFinderFee {
            finder_code: partner.finder_code.clone(),
            referred_party: purchase.referred_party.clone(),
            purchase_amount: purchase.purchase_amount,
            seat_count: purchase.seat_count,
            fee_percentage,
            fee_amount,
            is_first_purchase,
            is_recurring_partner: partner.is_recurring,
            stripe_session_id: purchase.stripe_session_id.clone(),
            notes: purchase.notes.clone(),
        }))
    }

    /// Caminho da compra: duplicidade e parceiro desconhecido só geram log.
    pub async fn record_from_purchase(
        &self,
        purchase: ReferredPurchase,
    ) -> Result<FeeRecording, AppError> {
        let finder_code = normalize_code(&purchase.finder_code);
        let purchase = ReferredPurchase {
            finder_code: finder_code.clone(),
            referred_party: normalize_email(&purchase.referred_party),
            ..purchase
        };

        let Some(partner) = self
            .store
            .find_partner(&finder_code)
            .await?
            .filter(|p| p.is_active)
        else {
            tracing::warn!(finder_code = %finder_code, "Finder code desconhecido, ignorando");
            return Ok(FeeRecording::UnknownPartner);
        };

        let Some(fee) = self.build_fee(&partner, &purchase).await? else {
            tracing::info!(
                finder_code = %finder_code,
                referred_party = %purchase.referred_party,
                "Finder fee já registrada para esta indicação, nada a fazer"
            );
            return Ok(FeeRecording::Duplicate);
        };

        let record = self.store.insert_finder_fee(fee).await?;
        tracing::info!(
            fee_id = %record.id,
            finder_code = %record.finder_code,
            fee_amount = %record.fee_amount,
            "Finder fee registrada"
        );
        Ok(FeeRecording::Recorded(record, partner))
    }

    /// Caminho do painel: a duplicidade vira erro visível para o admin.
    pub async fn create_manual(
        &self,
        payload: CreateFinderFeePayload,
    ) -> Result<FinderFeeRecord, AppError> {
        if payload.purchase_amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "O valor da compra deve ser positivo.".into(),
            ));
        }

        let finder_code = normalize_code(&payload.finder_code);
        let partner = self
            .store
            .find_partner(&finder_code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Parceiro {}", finder_code)))?;

        let purchase = ReferredPurchase {
            finder_code,
            referred_party: normalize_email(&payload.referred_party),
            purchase_amount: payload.purchase_amount,
            seat_count: payload.seat_count,
            stripe_session_id: None,
            notes: payload.notes,
        };

        let fee = self.build_fee(&partner, &purchase).await?.ok_or_else(|| {
            AppError::DuplicateFinderFee {
                finder_code: purchase.finder_code.clone(),
                referred_party: purchase.referred_party.clone(),
            }
        })?;

        let record = self.store.insert_finder_fee(fee).await?;
        tracing::info!(fee_id = %record.id, finder_code = %record.finder_code, "Finder fee manual registrada");
        Ok(record)
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        next: FinderFeeStatus,
    ) -> Result<FinderFeeRecord, AppError> {
        let current = self
            .store
            .find_finder_fee(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Finder fee {}", id)))?;

        if !current.status.can_transition_to(next) {
            return Err(AppError::InvalidInput(format!(
                "Transição de {:?} para {:?} não permitida.",
                current.status, next
            )));
        }

        // Outro admin pode ter mudado o status entre a leitura e a escrita.
        let updated = self
            .store
            .transition_finder_fee(id, current.status, next)
            .await?
            .ok_or_else(|| {
                AppError::InvalidInput("O status foi alterado por outra operação.".into())
            })?;

        tracing::info!(fee_id = %id, from = ?current.status, to = ?next, "Status da finder fee alterado");
        Ok(updated)
    }

    pub async fn list(&self, filter: &FinderFeeFilter) -> Result<Vec<FinderFeeRecord>, AppError> {
        self.store.list_finder_fees(filter).await
    }

    pub async fn create_partner(
        &self,
        payload: CreatePartnerPayload,
    ) -> Result<ReferralPartner, AppError> {
        let partner = self
            .store
            .create_partner(NewReferralPartner {
                finder_code: normalize_code(&payload.finder_code),
                name: payload.name.trim().to_string(),
                email: normalize_email(&payload.email),
                is_recurring: payload.is_recurring,
            })
            .await?;
        tracing::info!(finder_code = %partner.finder_code, "Parceiro cadastrado");
        Ok(partner)
    }

    pub async fn list_partners(&self) -> Result<Vec<ReferralPartner>, AppError> {
        self.store.list_partners().await
    }

    /// Ganhos pela tabela de volume, sobre as fees não rejeitadas.
    pub async fn partner_earnings(&self, finder_code: &str) -> Result<PartnerEarnings, AppError> {
        let finder_code = normalize_code(finder_code);
        if self.store.find_partner(&finder_code).await?.is_none() {
            return Err(AppError::NotFound(format!("Parceiro {}", finder_code)));
        }

        let fees = self.store.list_partner_fees(&finder_code).await?;
        let counted = fees.iter().filter(|f| f.status != FinderFeeStatus::Rejected);

        let (total_referred_seats, total_purchase_amount) = counted.fold(
            (0_i64, Decimal::ZERO),
            |(seats, amount), f| (seats + i64::from(f.seat_count), amount + f.purchase_amount),
        );
        let commission_rate = partner_volume_rate(total_referred_seats);

        Ok(PartnerEarnings {
            finder_code,
            total_referred_seats,
            total_purchase_amount,
            commission_rate,
            commission_amount: percentage_of(total_purchase_amount, commission_rate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryLedgerStore;
    use rust_decimal_macros::dec;

    async fn with_partner(is_recurring: bool) -> (Arc<MemoryLedgerStore>, FinderFeeService) {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = FinderFeeService::new(store.clone());
        service
            .create_partner(CreatePartnerPayload {
                finder_code: "abc123".into(),
                name: "Coach Rivera".into(),
                email: "Rivera@Example.com".into(),
                is_recurring,
            })
            .await
            .unwrap();
        (store, service)
    }

    fn purchase(amount: Decimal, seats: i32) -> ReferredPurchase {
        ReferredPurchase {
            finder_code: "ABC123".into(),
            referred_party: "Director@Club.org".into(),
            purchase_amount: amount,
            seat_count: seats,
            stripe_session_id: Some("cs_1".into()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn first_referral_records_a_pending_ten_percent_fee() {
        let (_, service) = with_partner(false).await;

        let FeeRecording::Recorded(fee, _) =
            service.record_from_purchase(purchase(dec!(1200.00), 12)).await.unwrap()
        else {
            panic!("esperava uma fee registrada");
        };

        assert_eq!(fee.fee_percentage, dec!(10));
        assert_eq!(fee.fee_amount, dec!(120.00));
        assert_eq!(fee.status, FinderFeeStatus::Pending);
        assert_eq!(fee.referred_party, "director@club.org");
        assert!(fee.is_first_purchase);
    }

    #[tokio::test]
    async fn non_recurring_partner_is_paid_once_per_party() {
        let (store, service) = with_partner(false).await;

        service.record_from_purchase(purchase(dec!(1200.00), 12)).await.unwrap();
        let second = service.record_from_purchase(purchase(dec!(800.00), 8)).await.unwrap();

        assert!(matches!(second, FeeRecording::Duplicate));
        assert_eq!(store.finder_fee_count().await, 1);
    }

    #[tokio::test]
    async fn recurring_partner_earns_five_percent_on_renewals() {
        let (store, service) = with_partner(true).await;

        service.record_from_purchase(purchase(dec!(1000.00), 10)).await.unwrap();
        let FeeRecording::Recorded(renewal, _) =
            service.record_from_purchase(purchase(dec!(1000.00), 10)).await.unwrap()
        else {
            panic!("esperava uma fee de renovação");
        };

        assert_eq!(renewal.fee_percentage, dec!(5));
        assert_eq!(renewal.fee_amount, dec!(50.00));
        assert!(!renewal.is_first_purchase);
        assert_eq!(store.finder_fee_count().await, 2);
    }

    #[tokio::test]
    async fn unknown_partner_is_ignored() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = FinderFeeService::new(store.clone());

        let outcome = service.record_from_purchase(purchase(dec!(100.00), 2)).await.unwrap();
        assert!(matches!(outcome, FeeRecording::UnknownPartner));
        assert_eq!(store.finder_fee_count().await, 0);
    }

    #[tokio::test]
    async fn manual_duplicate_is_reported_to_the_admin() {
        let (_, service) = with_partner(false).await;
        let payload = || CreateFinderFeePayload {
            finder_code: "ABC123".into(),
            referred_party: "director@club.org".into(),
            purchase_amount: dec!(500.00),
            seat_count: 5,
            notes: Some("indicação por telefone".into()),
        };

        service.create_manual(payload()).await.unwrap();
        let err = service.create_manual(payload()).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateFinderFee { .. }));
    }

    #[tokio::test]
    async fn status_follows_the_review_flow() {
        let (_, service) = with_partner(false).await;
        let FeeRecording::Recorded(fee, _) =
            service.record_from_purchase(purchase(dec!(300.00), 3)).await.unwrap()
        else {
            panic!("esperava uma fee registrada");
        };

        assert!(matches!(
            service.update_status(fee.id, FinderFeeStatus::Paid).await,
            Err(AppError::InvalidInput(_))
        ));

        let approved = service.update_status(fee.id, FinderFeeStatus::Approved).await.unwrap();
        assert_eq!(approved.status, FinderFeeStatus::Approved);
        let paid = service.update_status(fee.id, FinderFeeStatus::Paid).await.unwrap();
        assert_eq!(paid.status, FinderFeeStatus::Paid);

        assert!(matches!(
            service.update_status(fee.id, FinderFeeStatus::Rejected).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.update_status(Uuid::new_v4(), FinderFeeStatus::Approved).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn earnings_switch_to_the_bonus_rate_past_one_hundred_seats() {
        let (_, service) = with_partner(true).await;

        service.record_from_purchase(purchase(dec!(6000.00), 60)).await.unwrap();
        let earnings = service.partner_earnings("abc123").await.unwrap();
        assert_eq!(earnings.total_referred_seats, 60);
        assert_eq!(earnings.commission_rate, dec!(10));
        assert_eq!(earnings.commission_amount, dec!(600.00));

        service.record_from_purchase(purchase(dec!(5000.00), 50)).await.unwrap();
        let earnings = service.partner_earnings("ABC123").await.unwrap();
        assert_eq!(earnings.total_referred_seats, 110);
        assert_eq!(earnings.commission_rate, dec!(15));
        assert_eq!(earnings.commission_amount, dec!(1650.00));
    }
}
