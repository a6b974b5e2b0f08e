// src/db/finder_fee_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finder_fees::{
        FinderFeeFilter, FinderFeeRecord, FinderFeeStatus, NewFinderFee, NewReferralPartner,
        ReferralPartner,
    },
};

#[derive(Clone)]
pub struct FinderFeeRepository {
    pool: PgPool,
}

impl FinderFeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PARCEIROS
    // =========================================================================

    pub async fn find_partner(&self, finder_code: &str) -> Result<Option<ReferralPartner>, AppError> {
        let partner = sqlx::query_as::<_, ReferralPartner>(
            "SELECT * FROM referral_partners WHERE finder_code = $1",
        )
        .bind(finder_code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(partner)
    }

    pub async fn list_partners(&self) -> Result<Vec<ReferralPartner>, AppError> {
        let partners = sqlx::query_as::<_, ReferralPartner>(
            "SELECT * FROM referral_partners ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(partners)
    }

    pub async fn create_partner<'e, E>(
        &self,
        executor: E,
        partner: &NewReferralPartner,
    ) -> Result<ReferralPartner, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ReferralPartner>(
            r#"
            INSERT INTO referral_partners (finder_code, name, email, is_recurring)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&partner.finder_code)
        .bind(&partner.name)
        .bind(&partner.email)
        .bind(partner.is_recurring)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, format!("Parceiro {}", partner.finder_code)))
    }

    // =========================================================================
    //  FINDER FEES
    // =========================================================================

    /// Checagem prévia de duplicidade (não é constraint no banco).
    pub async fn count_for_party(
        &self,
        finder_code: &str,
        referred_party: &str,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM finder_fee_records
            WHERE finder_code = $1 AND referred_party = $2
            "#,
        )
        .bind(finder_code)
        .bind(referred_party)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        fee: &NewFinderFee,
    ) -> Result<FinderFeeRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, FinderFeeRecord>(
            r#"
            INSERT INTO finder_fee_records (
                finder_code, referred_party, purchase_amount, seat_count,
                fee_percentage, fee_amount, is_first_purchase, is_recurring_partner,
                stripe_session_id, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&fee.finder_code)
        .bind(&fee.referred_party)
        .bind(fee.purchase_amount)
        .bind(fee.seat_count)
        .bind(fee.fee_percentage)
        .bind(fee.fee_amount)
        .bind(fee.is_first_purchase)
        .bind(fee.is_recurring_partner)
        .bind(fee.stripe_session_id.as_deref())
        .bind(fee.notes.as_deref())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<FinderFeeRecord>, AppError> {
        let record = sqlx::query_as::<_, FinderFeeRecord>(
            "SELECT * FROM finder_fee_records WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Compare-and-swap no status: só atualiza se ainda estiver em `from`.
    pub async fn transition_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        from: FinderFeeStatus,
        to: FinderFeeStatus,
    ) -> Result<Option<FinderFeeRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, FinderFeeRecord>(
            r#"
            UPDATE finder_fee_records
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn list(&self, filter: &FinderFeeFilter) -> Result<Vec<FinderFeeRecord>, AppError> {
        let records = sqlx::query_as::<_, FinderFeeRecord>(
            r#"
            SELECT * FROM finder_fee_records
            WHERE ($1::finder_fee_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    pub async fn list_for_partner(&self, finder_code: &str) -> Result<Vec<FinderFeeRecord>, AppError> {
        let records = sqlx::query_as::<_, FinderFeeRecord>(
            "SELECT * FROM finder_fee_records WHERE finder_code = $1 ORDER BY created_at ASC",
        )
        .bind(finder_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
