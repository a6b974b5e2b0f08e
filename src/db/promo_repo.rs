// src/db/promo_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::promos::{NewPromoCode, NewPromoRedemption, PromoCode, PromoRedemption},
};

#[derive(Clone)]
pub struct PromoRepository {
    pool: PgPool,
}

impl PromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, AppError> {
        let promo = sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promo)
    }

    pub async fn list(&self) -> Result<Vec<PromoCode>, AppError> {
        let promos =
            sqlx::query_as::<_, PromoCode>("SELECT * FROM promo_codes ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(promos)
    }

    pub async fn create<'e, E>(&self, executor: E, promo: &NewPromoCode) -> Result<PromoCode, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, PromoCode>(
            r#"
            INSERT INTO promo_codes (code, discount_percentage, max_redemptions, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&promo.code)
        .bind(promo.discount_percentage)
        .bind(promo.max_redemptions)
        .bind(promo.expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, format!("Promo code {}", promo.code)))
    }

    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<PromoCode>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promo = sqlx::query_as::<_, PromoCode>(
            "UPDATE promo_codes SET is_active = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;
        Ok(promo)
    }

    pub async fn insert_redemption<'e, E>(
        &self,
        executor: E,
        redemption: &NewPromoRedemption,
    ) -> Result<PromoRedemption, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, PromoRedemption>(
            r#"
            INSERT INTO promo_redemptions (
                promo_code_id, referred_party, discount_applied, purchase_session_id
            )
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(redemption.promo_code_id)
        .bind(&redemption.referred_party)
        .bind(redemption.discount_applied)
        .bind(&redemption.purchase_session_id)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    /// Incremento atômico no banco (sem ler-depois-escrever).
    pub async fn increment_redemptions<'e, E>(&self, executor: E, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE promo_codes SET redemptions_count = redemptions_count + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
