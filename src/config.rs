// src/config.rs

use std::{env, str::FromStr, sync::Arc};

use anyhow::{bail, Context};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{
    common::db_utils::connect_and_migrate,
    db::{LedgerStore, MemoryLedgerStore, PgLedgerStore},
    services::{
        auth::AuthService,
        code_generator::CodeGenerator,
        email_service::{EmailService, HttpMailer, LogMailer, Mailer},
        finder_fee_service::FinderFeeService,
        ledger_service::LedgerService,
        organization_service::OrganizationService,
        promo_service::PromoService,
        purchase_service::PurchaseService,
        stripe::WebhookVerifier,
        trial_service::TrialService,
    },
};

const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("STORE_BACKEND desconhecido: {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub admin_password_hash: String,
    pub stripe_webhook_secret: String,
    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub list_price_per_seat: Decimal,
    pub bind_addr: String,
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{} deve ser definida", name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_backend = optional("STORE_BACKEND")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(StoreBackend::Postgres);

        let database_url = optional("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL deve ser definida quando STORE_BACKEND=postgres");
        }

        let list_price_per_seat = match optional("LIST_PRICE_PER_SEAT") {
            Some(raw) => Decimal::from_str(&raw)
                .with_context(|| format!("LIST_PRICE_PER_SEAT inválido: {}", raw))?,
            None => dec!(10.00),
        };

        Ok(Self {
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            admin_password_hash: required("ADMIN_PASSWORD_HASH")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            email_api_url: optional("EMAIL_API_URL").unwrap_or_else(|| DEFAULT_EMAIL_API_URL.into()),
            email_api_key: optional("EMAIL_API_KEY"),
            email_from: optional("EMAIL_FROM").unwrap_or_else(|| "no-reply@localhost".into()),
            list_price_per_seat,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub auth_service: AuthService,
    pub ledger_service: LedgerService,
    pub organization_service: OrganizationService,
    pub finder_fee_service: FinderFeeService,
    pub promo_service: PromoService,
    pub trial_service: TrialService,
    pub purchase_service: PurchaseService,
    pub webhook_verifier: WebhookVerifier,
    pub list_price_per_seat: Decimal,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn LedgerStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;
                let pool = connect_and_migrate(database_url).await?;
                Arc::new(PgLedgerStore::new(pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Usando o store em memória: nada será persistido");
                Arc::new(MemoryLedgerStore::new())
            }
        };

        let mailer: Arc<dyn Mailer> = match &config.email_api_key {
            Some(key) => Arc::new(HttpMailer::new(
                config.email_api_url.clone(),
                key.clone(),
                config.email_from.clone(),
            )?),
            None => {
                tracing::warn!("EMAIL_API_KEY ausente: e-mails só vão para o log");
                Arc::new(LogMailer)
            }
        };

        Ok(Self::from_parts(config, store, mailer))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(config: &Config, store: Arc<dyn LedgerStore>, mailer: Arc<dyn Mailer>) -> Self {
        let auth_service = AuthService::new(
            config.admin_password_hash.clone(),
            config.jwt_secret.clone(),
        );
        let ledger_service = LedgerService::new(store.clone(), CodeGenerator::new());
        let organization_service = OrganizationService::new(store.clone(), ledger_service.clone());
        let finder_fee_service = FinderFeeService::new(store.clone());
        let promo_service = PromoService::new(store.clone());
        let trial_service = TrialService::new(store.clone());
        let purchase_service = PurchaseService::new(
            store.clone(),
            organization_service.clone(),
            promo_service.clone(),
            finder_fee_service.clone(),
            EmailService::new(mailer),
        );

        tracing::info!(backend = store.backend_name(), "Estado da aplicação montado");

        Self {
            store,
            auth_service,
            ledger_service,
            organization_service,
            finder_fee_service,
            promo_service,
            trial_service,
            purchase_service,
            webhook_verifier: WebhookVerifier::new(config.stripe_webhook_secret.clone()),
            list_price_per_seat: config.list_price_per_seat,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_case_insensitively() {
        assert_eq!("Memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!(" postgres ".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
