// src/db/trial_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::trials::{NewTrialGrant, TrialGrant, TrialStatus},
};

#[derive(Clone)]
pub struct TrialRepository {
    pool: PgPool,
}

impl TrialRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<TrialGrant>, AppError> {
        let trial = sqlx::query_as::<_, TrialGrant>("SELECT * FROM trial_grants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trial)
    }

    pub async fn list(&self) -> Result<Vec<TrialGrant>, AppError> {
        let trials =
            sqlx::query_as::<_, TrialGrant>("SELECT * FROM trial_grants ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(trials)
    }

    pub async fn create<'e, E>(&self, executor: E, trial: &NewTrialGrant) -> Result<TrialGrant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, TrialGrant>(
            r#"
            INSERT INTO trial_grants (user_email, ends_at, notes)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&trial.user_email)
        .bind(trial.ends_at)
        .bind(trial.notes.as_deref())
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        ends_at: DateTime<Utc>,
        status: TrialStatus,
    ) -> Result<Option<TrialGrant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, TrialGrant>(
            r#"
            UPDATE trial_grants
            SET ends_at = $2, status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ends_at)
        .bind(status)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }
}
