// src/services/email_service.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{finder_fees::FinderFeeRecord, purchases::ProvisionedLicense};

// Falha de envio. Fica restrita a este módulo: nunca vira AppError.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Falha de transporte: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Provedor recusou o e-mail (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// Envia pela API HTTP do provedor (`{from, to, subject, text}` + bearer).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&OutboundEmail {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                text: &message.text,
            })
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(MailError::Rejected { status, body })
    }
}

/// Sem chave de API: só registra no log (desenvolvimento local).
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "E-mail (somente log)\n{}", message.text);
        Ok(())
    }
}

pub fn purchase_confirmation(payer_email: &str, license: &ProvisionedLicense) -> EmailMessage {
    let mut text = String::from("Obrigado pela compra! Seguem os seus códigos de acesso.\n");
    for (team_name, coach_code, member_code) in license.all_codes() {
        text.push_str(&format!(
            "\n{}\n  Código do treinador (uso único): {}\n  Código da equipe (atletas): {}\n",
            team_name, coach_code, member_code
        ));
    }
    if let ProvisionedLicense::Organization(org) = license {
        let failed = org.failed_teams();
        if failed > 0 {
            text.push_str(&format!(
                "\n{} equipe(s) ainda estão sendo preparadas; entraremos em contato.\n",
                failed
            ));
        }
    }

    EmailMessage {
        to: payer_email.to_string(),
        subject: "Seus códigos de acesso".into(),
        text,
    }
}

pub fn partner_notification(partner_email: &str, fee: &FinderFeeRecord) -> EmailMessage {
    EmailMessage {
        to: partner_email.to_string(),
        subject: "Nova indicação registrada".into(),
        text: format!(
            "Uma compra de {} assentos ({}) foi feita com o seu código {}.\n\
             Comissão de {}% registrada: {} (aguardando aprovação).\n",
            fee.seat_count, fee.purchase_amount, fee.finder_code, fee.fee_percentage, fee.fee_amount
        ),
    }
}

#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Tenta enviar; erro só vai para o log. Retorna se o envio deu certo.
    pub async fn send_best_effort(&self, message: EmailMessage) -> bool {
        match self.mailer.send(&message).await {
            Ok(()) => {
                tracing::info!(to = %message.to, subject = %message.subject, "E-mail enviado");
                true
            }
            Err(e) => {
                tracing::error!(to = %message.to, error = %e, "Falha ao enviar e-mail");
                false
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Guarda as mensagens em vez de enviar.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
    }

    impl RecordingMailer {
        pub async fn messages(&self) -> Vec<EmailMessage> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _message: &EmailMessage) -> Result<(), MailError> {
            Err(MailError::Rejected {
                status: 503,
                body: "indisponível".into(),
            })
        }
    }
}
