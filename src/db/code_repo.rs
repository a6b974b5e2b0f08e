// src/db/code_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::codes::{CodeFilter, NewCode, RedemptionCode},
};

// O repositório de códigos, responsável pela tabela 'redemption_codes'
#[derive(Clone)]
pub struct CodeRepository {
    pool: PgPool,
}

impl CodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura (usa a pool principal)
    // ---

    pub async fn exists(&self, code: &str) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM redemption_codes WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn find_by_code<'e, E>(
        &self,
        executor: E,
        code: &str,
    ) -> Result<Option<RedemptionCode>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let found = sqlx::query_as::<_, RedemptionCode>(
            "SELECT * FROM redemption_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(executor)
        .await?;
        Ok(found)
    }

    pub async fn list(&self, filter: &CodeFilter) -> Result<Vec<RedemptionCode>, AppError> {
        // Filtros opcionais: NULL desliga o critério
        let codes = sqlx::query_as::<_, RedemptionCode>(
            r#"
            SELECT * FROM redemption_codes
            WHERE ($1::code_kind IS NULL OR kind = $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.kind)
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await?;
        Ok(codes)
    }

    // ---
    // Escrita (transacional, recebe o executor)
    // ---

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        new_code: &NewCode,
        linked_code_id: Option<Uuid>,
    ) -> Result<RedemptionCode, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RedemptionCode>(
            r#"
            INSERT INTO redemption_codes (code, kind, max_uses, linked_code_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&new_code.code)
        .bind(new_code.kind)
        .bind(new_code.max_uses)
        .bind(linked_code_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, format!("Código {}", new_code.code)))
    }

    /// Fecha o vínculo bidirecional (o primeiro código nasce sem par).
    pub async fn link<'e, E>(
        &self,
        executor: E,
        code_id: Uuid,
        linked_code_id: Uuid,
    ) -> Result<RedemptionCode, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = sqlx::query_as::<_, RedemptionCode>(
            r#"
            UPDATE redemption_codes
            SET linked_code_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(code_id)
        .bind(linked_code_id)
        .fetch_one(executor)
        .await?;
        Ok(code)
    }

    /// Resgate atômico: a checagem de capacidade e o incremento são um único UPDATE.
    /// Retorna None quando o código não existe, está inativo ou já está cheio.
    pub async fn try_increment<'e, E>(
        &self,
        executor: E,
        code: &str,
    ) -> Result<Option<RedemptionCode>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let redeemed = sqlx::query_as::<_, RedemptionCode>(
            r#"
            UPDATE redemption_codes
            SET uses_count = uses_count + 1, updated_at = NOW()
            WHERE code = $1 AND is_active = TRUE AND uses_count < max_uses
            RETURNING *
            "#,
        )
        .bind(code)
        .fetch_optional(executor)
        .await?;
        Ok(redeemed)
    }

    pub async fn set_active<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        is_active: bool,
    ) -> Result<Option<RedemptionCode>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let code = sqlx::query_as::<_, RedemptionCode>(
            r#"
            UPDATE redemption_codes
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?;
        Ok(code)
    }
}
