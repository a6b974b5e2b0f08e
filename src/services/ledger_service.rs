// src/services/ledger_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, normalize::normalize_code},
    db::LedgerStore,
    models::codes::{
        CodeFilter, CodeKind, CodePair, NewCode, RedeemAttempt, RedemptionCode, RedemptionOutcome,
    },
    services::code_generator::CodeGenerator,
};

/// Tentativas de sortear um código que ainda não existe.
pub const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    generator: CodeGenerator,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, generator: CodeGenerator) -> Self {
        Self { store, generator }
    }

    /// Sorteia um código livre, com número limitado de tentativas.
    async fn unique_code(&self, kind: CodeKind) -> Result<String, AppError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let candidate = self.generator.generate(kind).await;
            if !self.store.code_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::warn!(attempt, kind = ?kind, "Colisão de código, sorteando de novo");
        }
        Err(AppError::InternalServerError(anyhow::anyhow!(
            "Não foi possível gerar um código único após {} tentativas",
            MAX_CODE_ATTEMPTS
        )))
    }

    /// Códigos novos para um par, ainda não persistidos.
    pub async fn new_pair(&self, seat_count: i32) -> Result<(NewCode, NewCode), AppError> {
        if seat_count < 1 {
            return Err(AppError::InvalidInput(
                "A quantidade de assentos deve ser pelo menos 1.".into(),
            ));
        }

        let coach = NewCode {
            code: self.unique_code(CodeKind::Coach).await?,
            kind: CodeKind::Coach,
            max_uses: 1,
        };
        let member = NewCode {
            code: self.unique_code(CodeKind::Member).await?,
            kind: CodeKind::Member,
            max_uses: seat_count,
        };
        Ok((coach, member))
    }

    /// Cria o par treinador/equipe. Ou os dois existem, vinculados, ou nenhum.
    pub async fn create_code_pair(&self, seat_count: i32) -> Result<CodePair, AppError> {
        let (coach, member) = self.new_pair(seat_count).await?;
        let pair = self.store.insert_code_pair(coach, member).await?;

        tracing::info!(
            coach_code = %pair.coach.code,
            member_code = %pair.member.code,
            seat_count,
            "Par de códigos criado"
        );
        Ok(pair)
    }

    /// Consome um uso do código. Código cheio nunca é alterado.
    pub async fn redeem(&self, code: &str) -> Result<RedemptionOutcome, AppError> {
        let code = normalize_code(code);

        match self.store.redeem_code(&code).await? {
            RedeemAttempt::Redeemed(row) => {
                tracing::info!(
                    code = %row.code,
                    uses_count = row.uses_count,
                    max_uses = row.max_uses,
                    "Código resgatado"
                );
                Ok(RedemptionOutcome::from(row))
            }
            RedeemAttempt::AtCapacity(row) => {
                tracing::info!(code = %row.code, max_uses = row.max_uses, "Código sem vagas");
                Err(AppError::AtCapacity {
                    code: row.code,
                    max_uses: row.max_uses,
                })
            }
            RedeemAttempt::Missing => Err(AppError::NotFound(format!("Código {}", code))),
        }
    }

    pub async fn list_codes(&self, filter: &CodeFilter) -> Result<Vec<RedemptionCode>, AppError> {
        self.store.list_codes(filter).await
    }

    /// Desativar preserva o histórico de usos.
    pub async fn set_code_active(&self, id: Uuid, is_active: bool) -> Result<RedemptionCode, AppError> {
        let code = self.store.set_code_active(id, is_active).await?;
        tracing::info!(code = %code.code, is_active, "Status do código alterado");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryLedgerStore, services::code_generator::is_well_formed};

    fn service_with(store: Arc<MemoryLedgerStore>) -> LedgerService {
        LedgerService::new(store, CodeGenerator::seeded(11))
    }

    #[tokio::test]
    async fn pair_is_linked_both_ways_with_the_right_capacities() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = service_with(store.clone());

        let pair = service.create_code_pair(12).await.unwrap();

        assert_eq!(pair.coach.kind, CodeKind::Coach);
        assert_eq!(pair.coach.max_uses, 1);
        assert_eq!(pair.member.kind, CodeKind::Member);
        assert_eq!(pair.member.max_uses, 12);
        assert_eq!(pair.coach.linked_code_id, Some(pair.member.id));
        assert_eq!(pair.member.linked_code_id, Some(pair.coach.id));
        assert!(is_well_formed(&pair.coach.code, "COACH"));
        assert!(is_well_formed(&pair.member.code, "TEAM"));
        assert_eq!(store.code_count().await, 2);
    }

    #[tokio::test]
    async fn failed_member_insert_leaves_no_orphan_coach_code() {
        let store = Arc::new(MemoryLedgerStore::new());
        store.fail_member_inserts(true).await;
        let service = service_with(store.clone());

        assert!(service.create_code_pair(5).await.is_err());
        assert_eq!(store.code_count().await, 0);
    }

    #[tokio::test]
    async fn zero_seats_is_rejected() {
        let service = service_with(Arc::new(MemoryLedgerStore::new()));
        assert!(matches!(
            service.create_code_pair(0).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn redeem_counts_up_to_capacity_and_then_stops() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = service_with(store.clone());
        let pair = service.create_code_pair(3).await.unwrap();

        for expected in 1..=3 {
            let outcome = service.redeem(&pair.member.code).await.unwrap();
            assert_eq!(outcome.uses_count, expected);
            assert_eq!(outcome.linked_code_id, Some(pair.coach.id));
            assert!(outcome.consumes_seat);
        }

        let err = service.redeem(&pair.member.code).await.unwrap_err();
        assert!(matches!(err, AppError::AtCapacity { max_uses: 3, .. }));

        let after = store.find_code(&pair.member.code).await.unwrap().unwrap();
        assert_eq!(after.uses_count, 3);
    }

    #[tokio::test]
    async fn coach_code_is_single_use() {
        let service = service_with(Arc::new(MemoryLedgerStore::new()));
        let pair = service.create_code_pair(10).await.unwrap();

        let outcome = service.redeem(&pair.coach.code).await.unwrap();
        assert_eq!(outcome.kind, CodeKind::Coach);
        assert_eq!(outcome.remaining_uses, 0);

        assert!(matches!(
            service.redeem(&pair.coach.code).await,
            Err(AppError::AtCapacity { .. })
        ));
    }

    #[tokio::test]
    async fn redeem_accepts_lowercase_and_padded_input() {
        let service = service_with(Arc::new(MemoryLedgerStore::new()));
        let pair = service.create_code_pair(2).await.unwrap();

        let typed = format!("  {}  ", pair.member.code.to_lowercase());
        assert!(service.redeem(&typed).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_and_inactive_codes_are_not_found() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = service_with(store.clone());

        assert!(matches!(
            service.redeem("TEAM-ZZZZ-ZZZZ-ZZZZ").await,
            Err(AppError::NotFound(_))
        ));

        let pair = service.create_code_pair(4).await.unwrap();
        service.set_code_active(pair.member.id, false).await.unwrap();
        assert!(matches!(
            service.redeem(&pair.member.code).await,
            Err(AppError::NotFound(_))
        ));

        let after = store.find_code(&pair.member.code).await.unwrap().unwrap();
        assert_eq!(after.uses_count, 0);
    }

    #[tokio::test]
    async fn concurrent_redeems_of_the_last_slot_yield_one_success() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = service_with(store.clone());
        let code = store.seed_code("TEAM-LAST-SLXT-2345", CodeKind::Member, 5).await;
        for _ in 0..4 {
            service.redeem(&code.code).await.unwrap();
        }

        let (a, b) = tokio::join!(service.redeem(&code.code), service.redeem(&code.code));

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        let failure = if a.is_err() { a } else { b };
        assert!(matches!(failure, Err(AppError::AtCapacity { .. })));

        let after = store.find_code(&code.code).await.unwrap().unwrap();
        assert_eq!(after.uses_count, 5);
    }

    #[tokio::test]
    async fn many_tasks_never_push_a_code_past_its_capacity() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = service_with(store.clone());
        let code = store.seed_code("TEAM-MANY-TASK-S234", CodeKind::Member, 10).await;

        let mut handles = Vec::new();
        for _ in 0..40 {
            let service = service.clone();
            let value = code.code.clone();
            handles.push(tokio::spawn(async move { service.redeem(&value).await.is_ok() }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 10);
        let after = store.find_code(&code.code).await.unwrap().unwrap();
        assert_eq!(after.uses_count, 10);
    }
}
