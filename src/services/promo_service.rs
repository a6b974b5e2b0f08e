// src/services/promo_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        normalize::{normalize_code, normalize_email},
    },
    db::LedgerStore,
    models::promos::{
        CreatePromoPayload, NewPromoCode, NewPromoRedemption, PromoCode, PromoRedemption,
        PromoValidation,
    },
    services::commission::round_money,
};

/// Desconto dado sobre o valor já descontado que o Stripe cobrou.
pub fn discount_from_paid(amount_paid: Decimal, discount_percentage: Decimal) -> Decimal {
    if discount_percentage <= Decimal::ZERO || discount_percentage >= dec!(100) {
        return Decimal::ZERO;
    }
    round_money(amount_paid * discount_percentage / (dec!(100) - discount_percentage))
}

#[derive(Clone)]
pub struct PromoService {
    store: Arc<dyn LedgerStore>,
}

impl PromoService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, payload: CreatePromoPayload) -> Result<PromoCode, AppError> {
        if payload.discount_percentage < dec!(1) || payload.discount_percentage > dec!(100) {
            return Err(AppError::InvalidInput(
                "O desconto deve estar entre 1% e 100%.".into(),
            ));
        }
        if payload.expires_at.is_some_and(|exp| exp <= Utc::now()) {
            return Err(AppError::InvalidInput(
                "A data de expiração precisa estar no futuro.".into(),
            ));
        }

        let promo = self
            .store
            .create_promo(NewPromoCode {
                code: normalize_code(&payload.code),
                discount_percentage: payload.discount_percentage,
                max_redemptions: payload.max_redemptions,
                expires_at: payload.expires_at,
            })
            .await?;
        tracing::info!(code = %promo.code, discount = %promo.discount_percentage, "Promo code criado");
        Ok(promo)
    }

    pub async fn list(&self) -> Result<Vec<PromoCode>, AppError> {
        self.store.list_promos().await
    }

    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<PromoCode, AppError> {
        let promo = self.store.set_promo_active(id, is_active).await?;
        tracing::info!(code = %promo.code, is_active, "Status do promo code alterado");
        Ok(promo)
    }

    /// Consulta pública do checkout. Nunca devolve erro para código inexistente.
    pub async fn validate(&self, code: &str) -> Result<PromoValidation, AppError> {
        let code = normalize_code(code);
        let validation = match self.store.find_promo(&code).await? {
            None => PromoValidation {
                code,
                valid: false,
                discount_percentage: None,
                reason: Some("not_found".into()),
            },
            Some(promo) => match promo.unusable_reason(Utc::now()) {
                Some(reason) => PromoValidation {
                    code,
                    valid: false,
                    discount_percentage: None,
                    reason: Some(reason.into()),
                },
                None => PromoValidation {
                    code,
                    valid: true,
                    discount_percentage: Some(promo.discount_percentage),
                    reason: None,
                },
            },
        };
        Ok(validation)
    }

    /// Registro da compra. Não há checagem de duplicidade por parte indicada:
    /// cada compra com o código gera um registro e um incremento.
    pub async fn record_redemption(
        &self,
        code: &str,
        referred_party: &str,
        amount_paid: Decimal,
        purchase_session_id: &str,
    ) -> Result<Option<PromoRedemption>, AppError> {
        let code = normalize_code(code);
        let Some(promo) = self.store.find_promo(&code).await? else {
            tracing::warn!(code = %code, "Promo code desconhecido na compra, ignorando");
            return Ok(None);
        };

        // O desconto já foi cobrado pelo Stripe; o registro acontece mesmo assim.
        if let Some(reason) = promo.unusable_reason(Utc::now()) {
            tracing::warn!(code = %code, reason, "Promo code fora de uso aplicado numa compra");
        }

        let redemption = self
            .store
            .record_promo_redemption(NewPromoRedemption {
                promo_code_id: promo.id,
                referred_party: normalize_email(referred_party),
                discount_applied: discount_from_paid(amount_paid, promo.discount_percentage),
                purchase_session_id: purchase_session_id.to_string(),
            })
            .await?;

        tracing::info!(code = %code, session_id = purchase_session_id, "Promo code registrado");
        Ok(Some(redemption))
    }
}
