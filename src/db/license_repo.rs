// src/db/license_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::licenses::{LicenseGrant, NewOrganization, OrganizationLicense, SubscriptionStatus},
};

// `seats_consumed` é derivado do código de equipe (member), nunca gravado.
const GRANT_SELECT: &str = r#"
    SELECT
        g.id, g.organization_id, g.team_name, g.payer_email,
        g.coach_code_id, g.member_code_id,
        g.seat_total, m.uses_count AS seats_consumed,
        g.discount_percentage, g.price_per_seat, g.amount_paid,
        g.subscription_status,
        g.stripe_session_id, g.stripe_subscription_id,
        g.created_at, g.updated_at
    FROM license_grants g
    JOIN redemption_codes m ON m.id = g.member_code_id
"#;

/// Campos da licença que a transação de equipe grava.
pub struct GrantInsert<'a> {
    pub organization_id: Option<Uuid>,
    pub team_name: &'a str,
    pub payer_email: &'a str,
    pub coach_code_id: Uuid,
    pub member_code_id: Uuid,
    pub seat_total: i32,
    pub discount_percentage: Decimal,
    pub price_per_seat: Decimal,
    pub amount_paid: Decimal,
    pub stripe_session_id: Option<&'a str>,
    pub stripe_subscription_id: Option<&'a str>,
}

#[derive(Clone)]
pub struct LicenseRepository {
    pool: PgPool,
}

impl LicenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    /// Checagem de idempotência do webhook: a sessão já gerou licença?
    pub async fn session_exists(&self, session_id: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM license_grants WHERE stripe_session_id = $1)
                OR EXISTS(SELECT 1 FROM organization_licenses WHERE stripe_session_id = $1)
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn find_grant<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<LicenseGrant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{GRANT_SELECT} WHERE g.id = $1");
        let grant = sqlx::query_as::<_, LicenseGrant>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(grant)
    }

    pub async fn list_by_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<LicenseGrant>, AppError> {
        let sql = format!("{GRANT_SELECT} WHERE g.organization_id = $1 ORDER BY g.created_at ASC");
        let grants = sqlx::query_as::<_, LicenseGrant>(&sql)
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(grants)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn create_organization<'e, E>(
        &self,
        executor: E,
        org: &NewOrganization,
    ) -> Result<OrganizationLicense, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let organization = sqlx::query_as::<_, OrganizationLicense>(
            r#"
            INSERT INTO organization_licenses (
                organization_name, payer_email, total_seats, number_of_teams,
                amount_paid, stripe_session_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&org.organization_name)
        .bind(&org.payer_email)
        .bind(org.total_seats)
        .bind(org.number_of_teams)
        .bind(org.amount_paid)
        .bind(org.stripe_session_id.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Sessão de compra"))?;

        Ok(organization)
    }

    /// Grava a licença e devolve apenas o id; a leitura com `seats_consumed`
    /// é feita depois, na mesma transação.
    pub async fn insert_grant<'e, E>(
        &self,
        executor: E,
        grant: &GrantInsert<'_>,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO license_grants (
                organization_id, team_name, payer_email,
                coach_code_id, member_code_id, seat_total,
                discount_percentage, price_per_seat, amount_paid,
                stripe_session_id, stripe_subscription_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(grant.organization_id)
        .bind(grant.team_name)
        .bind(grant.payer_email)
        .bind(grant.coach_code_id)
        .bind(grant.member_code_id)
        .bind(grant.seat_total)
        .bind(grant.discount_percentage)
        .bind(grant.price_per_seat)
        .bind(grant.amount_paid)
        .bind(grant.stripe_session_id)
        .bind(grant.stripe_subscription_id)
        .fetch_one(executor)
        .await?;

        Ok(id)
    }

    pub async fn set_status_by_subscription<'e, E>(
        &self,
        executor: E,
        stripe_subscription_id: &str,
        status: SubscriptionStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE license_grants
            SET subscription_status = $2, updated_at = NOW()
            WHERE stripe_subscription_id = $1
            "#,
        )
        .bind(stripe_subscription_id)
        .bind(status)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
