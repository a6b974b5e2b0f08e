// src/services/trial_service.rs

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    common::{error::AppError, normalize::normalize_email},
    db::LedgerStore,
    models::trials::{CreateTrialPayload, NewTrialGrant, TrialGrant, TrialStatus},
};

#[derive(Clone)]
pub struct TrialService {
    store: Arc<dyn LedgerStore>,
}

impl TrialService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    async fn get(&self, id: Uuid) -> Result<TrialGrant, AppError> {
        self.store
            .find_trial(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trial {}", id)))
    }

    pub async fn grant(&self, payload: CreateTrialPayload) -> Result<TrialGrant, AppError> {
        let trial = self
            .store
            .create_trial(NewTrialGrant {
                user_email: normalize_email(&payload.user_email),
                ends_at: Utc::now() + Duration::days(payload.days),
                notes: payload.notes,
            })
            .await?;
        tracing::info!(trial_id = %trial.id, user_email = %trial.user_email, days = payload.days, "Trial concedido");
        Ok(trial)
    }

    /// Soma dias ao fim atual; se já venceu, conta a partir de agora.
    pub async fn extend(&self, id: Uuid, days: i64) -> Result<TrialGrant, AppError> {
        let trial = self.get(id).await?;
        if trial.status == TrialStatus::Revoked {
            return Err(AppError::InvalidInput(
                "Trial revogado não pode ser estendido.".into(),
            ));
        }

        let now = Utc::now();
        let base = trial.ends_at.max(now);
        let updated = self
            .store
            .update_trial(id, base + Duration::days(days), TrialStatus::Active)
            .await?;
        tracing::info!(trial_id = %id, ends_at = %updated.ends_at, "Trial estendido");
        Ok(updated)
    }

    pub async fn revoke(&self, id: Uuid) -> Result<TrialGrant, AppError> {
        let trial = self.get(id).await?;
        let updated = self
            .store
            .update_trial(id, trial.ends_at, TrialStatus::Revoked)
            .await?;
        tracing::info!(trial_id = %id, "Trial revogado");
        Ok(updated)
    }

    pub async fn list(&self) -> Result<Vec<TrialGrant>, AppError> {
        self.store.list_trials().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryLedgerStore;

    fn payload(days: i64) -> CreateTrialPayload {
        CreateTrialPayload {
            user_email: " Parent@Example.com ".into(),
            days,
            notes: None,
        }
    }

    #[tokio::test]
    async fn grant_starts_an_active_trial() {
        let service = TrialService::new(Arc::new(MemoryLedgerStore::new()));
        let trial = service.grant(payload(14)).await.unwrap();

        assert_eq!(trial.user_email, "parent@example.com");
        assert_eq!(trial.status, TrialStatus::Active);
        assert!(trial.is_running(Utc::now()));
        assert!(trial.ends_at > Utc::now() + Duration::days(13));
    }

    #[tokio::test]
    async fn extend_adds_to_the_current_end() {
        let service = TrialService::new(Arc::new(MemoryLedgerStore::new()));
        let trial = service.grant(payload(10)).await.unwrap();

        let extended = service.extend(trial.id, 5).await.unwrap();
        assert_eq!(extended.ends_at, trial.ends_at + Duration::days(5));
    }

    #[tokio::test]
    async fn expired_trial_is_extended_from_now() {
        let store = Arc::new(MemoryLedgerStore::new());
        let service = TrialService::new(store.clone());
        let trial = service.grant(payload(3)).await.unwrap();
        store
            .update_trial(trial.id, Utc::now() - Duration::days(30), TrialStatus::Active)
            .await
            .unwrap();

        let extended = service.extend(trial.id, 7).await.unwrap();
        assert!(extended.ends_at > Utc::now() + Duration::days(6));
        assert!(extended.is_running(Utc::now()));
    }

    #[tokio::test]
    async fn revoked_trial_cannot_be_extended() {
        let service = TrialService::new(Arc::new(MemoryLedgerStore::new()));
        let trial = service.grant(payload(10)).await.unwrap();

        let revoked = service.revoke(trial.id).await.unwrap();
        assert_eq!(revoked.status, TrialStatus::Revoked);
        assert!(!revoked.is_running(Utc::now()));

        assert!(matches!(
            service.extend(trial.id, 5).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.revoke(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
