// src/services/stripe.rs
//
// Verificação da assinatura do webhook e tradução dos eventos do Stripe
// para os tipos do ledger.

use std::collections::HashMap;

use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    common::{
        error::AppError,
        normalize::{normalize_code, normalize_email},
    },
    models::{
        licenses::SubscriptionStatus,
        purchases::{OrganizationPurchase, PurchaseConfirmed},
    },
    services::commission::{round_money, seat_discount_percentage},
};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            tolerance_secs: SIGNATURE_TOLERANCE_SECS,
        }
    }

    pub fn verify(&self, header: &str, payload: &[u8]) -> Result<(), AppError> {
        self.verify_at(header, payload, Utc::now().timestamp())
    }

    /// `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`, HMAC-SHA256 de `"{t}.{corpo}"`.
    pub fn verify_at(&self, header: &str, payload: &[u8], now: i64) -> Result<(), AppError> {
        let mut timestamp: Option<&str> = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
        let ts: i64 = timestamp.parse().map_err(|_| AppError::InvalidSignature)?;
        if (now - ts).abs() > self.tolerance_secs {
            tracing::warn!(ts, now, "Webhook fora da janela de tolerância");
            return Err(AppError::InvalidSignature);
        }

        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| AppError::InvalidSignature)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        // Comparação em tempo constante
        let valid = signatures.iter().any(|sig| {
            hex::decode(sig)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });

        if valid {
            Ok(())
        } else {
            Err(AppError::InvalidSignature)
        }
    }
}

/// Gera o header de assinatura (usado nos testes e em ferramentas locais).
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, AppError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AppError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

// --- Eventos ---

#[derive(Debug, Clone, PartialEq)]
pub enum StripeEvent {
    CheckoutCompleted(PurchaseConfirmed),
    SubscriptionChanged {
        subscription_id: String,
        status: SubscriptionStatus,
    },
    Ignored {
        event_type: String,
    },
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct CheckoutSession {
    id: String,
    amount_total: Option<i64>,
    customer_details: Option<CustomerDetails>,
    customer_email: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Deserialize)]
struct Subscription {
    id: String,
    status: String,
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::InvalidInput(message.into())
}

fn non_empty(metadata: &HashMap<String, String>, key: &str) -> Option<String> {
    metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_metadata<T: std::str::FromStr>(
    metadata: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    non_empty(metadata, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| invalid(format!("Metadado {} inválido: {}", key, raw)))
        })
        .transpose()
}

/// Aceita `"10,20,30"` ou `"[10,20,30]"`.
pub fn parse_seats_per_team(raw: &str) -> Result<Vec<i32>, AppError> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return serde_json::from_str(raw)
            .map_err(|_| invalid(format!("seats_per_team inválido: {}", raw)));
    }
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| invalid(format!("seats_per_team inválido: {}", raw)))
        })
        .collect()
}

fn purchase_from_session(session: CheckoutSession) -> Result<PurchaseConfirmed, AppError> {
    let metadata = &session.metadata;

    let seat_count: i32 = parse_metadata(metadata, "seat_count")?
        .ok_or_else(|| invalid("Metadado seat_count ausente"))?;
    let cents = session
        .amount_total
        .ok_or_else(|| invalid("amount_total ausente"))?;
    let amount_paid = Decimal::new(cents, 2);

    let payer_email = session
        .customer_details
        .and_then(|d| d.email)
        .or(session.customer_email)
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty())
        .ok_or_else(|| invalid("E-mail do comprador ausente"))?;

    let discount_percentage = parse_metadata::<Decimal>(metadata, "discount_percentage")?
        .unwrap_or_else(|| seat_discount_percentage(seat_count));
    let price_per_seat = match parse_metadata::<Decimal>(metadata, "price_per_seat")? {
        Some(price) => price,
        None if seat_count > 0 => round_money(amount_paid / Decimal::from(seat_count)),
        None => Decimal::ZERO,
    };

    let number_of_teams: i32 = parse_metadata(metadata, "number_of_teams")?.unwrap_or(1);
    let team_name = non_empty(metadata, "team_name");

    let organization = if number_of_teams > 1 {
        let seats_per_team = non_empty(metadata, "seats_per_team")
            .map(|raw| parse_seats_per_team(&raw))
            .transpose()?;
        Some(OrganizationPurchase {
            organization_name: non_empty(metadata, "organization_name")
                .or_else(|| team_name.clone())
                .unwrap_or_else(|| payer_email.clone()),
            number_of_teams,
            seats_per_team,
        })
    } else {
        None
    };

    Ok(PurchaseConfirmed {
        session_id: session.id,
        payer_email,
        amount_paid,
        seat_count,
        discount_percentage,
        price_per_seat,
        team_name,
        organization,
        promo_code: non_empty(metadata, "promo_code").map(|c| normalize_code(&c)),
        finder_code: non_empty(metadata, "finder_code").map(|c| normalize_code(&c)),
        subscription_id: session.subscription,
    })
}

pub fn parse_event(payload: &[u8]) -> Result<StripeEvent, AppError> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| invalid(format!("Evento do Stripe ilegível: {}", e)))?;
    tracing::debug!(event_id = %raw.id, event_type = %raw.event_type, "Evento do Stripe recebido");

    let event = match raw.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(raw.data.object)
                .map_err(|e| invalid(format!("Checkout session ilegível: {}", e)))?;
            StripeEvent::CheckoutCompleted(purchase_from_session(session)?)
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let sub: Subscription = serde_json::from_value(raw.data.object)
                .map_err(|e| invalid(format!("Assinatura ilegível: {}", e)))?;
            let status = if raw.event_type == "customer.subscription.deleted" {
                SubscriptionStatus::Cancelled
            } else {
                SubscriptionStatus::from_stripe(&sub.status)
            };
            StripeEvent::SubscriptionChanged {
                subscription_id: sub.id,
                status,
            }
        }
        _ => StripeEvent::Ignored {
            event_type: raw.event_type,
        },
    };
    Ok(event)
}


#[cfg(test)]
mod tests {
    use super::{fixtures::checkout_event, *};
    use rust_decimal_macros::dec;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    #[test]
    fn valid_signature_is_accepted() {
        let verifier = WebhookVerifier::new(SECRET.into());
        let body = br#"{"id":"evt_1"}"#;
        let header = sign_payload(SECRET, 1_700_000_000, body).unwrap();

        assert!(verifier.verify_at(&header, body, 1_700_000_010).is_ok());
    }

    #[test]
    fn tampered_body_or_wrong_secret_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET.into());
        let body = br#"{"id":"evt_1"}"#;
        let header = sign_payload(SECRET, 1_700_000_000, body).unwrap();

        assert!(matches!(
            verifier.verify_at(&header, br#"{"id":"evt_2"}"#, 1_700_000_000),
            Err(AppError::InvalidSignature)
        ));

        let other = sign_payload("whsec_other", 1_700_000_000, body).unwrap();
        assert!(verifier.verify_at(&other, body, 1_700_000_000).is_err());
        assert!(verifier.verify_at("garbage", body, 1_700_000_000).is_err());
        assert!(verifier.verify_at("t=abc,v1=zz", body, 1_700_000_000).is_err());
    }

    #[test]
    fn stale_timestamps_are_rejected() {
        let verifier = WebhookVerifier::new(SECRET.into());
        let body = b"{}";
        let header = sign_payload(SECRET, 1_700_000_000, body).unwrap();

        assert!(verifier.verify_at(&header, body, 1_700_000_000 + 301).is_err());
        assert!(verifier.verify_at(&header, body, 1_700_000_000 + 300).is_ok());
    }

    #[test]
    fn any_matching_v1_signature_is_enough() {
        let verifier = WebhookVerifier::new(SECRET.into());
        let body = b"{}";
        let good = sign_payload(SECRET, 1_700_000_000, body).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1={},v1={}", "00".repeat(32), good_sig);

        assert!(verifier.verify_at(&header, body, 1_700_000_000).is_ok());
    }

    #[test]
    fn checkout_session_becomes_a_single_team_purchase() {
        let payload = checkout_event(
            "cs_1",
            "Director@Club.org",
            120_000,
            json!({ "seat_count": "12", "team_name": "U12 Falcons", "finder_code": "abc123" }),
        );

        let StripeEvent::CheckoutCompleted(purchase) = parse_event(&payload).unwrap() else {
            panic!("esperava checkout");
        };
        assert_eq!(purchase.session_id, "cs_1");
        assert_eq!(purchase.payer_email, "director@club.org");
        assert_eq!(purchase.amount_paid, dec!(1200.00));
        assert_eq!(purchase.seat_count, 12);
        assert_eq!(purchase.discount_percentage, dec!(10));
        assert_eq!(purchase.price_per_seat, dec!(100.00));
        assert_eq!(purchase.finder_code.as_deref(), Some("ABC123"));
        assert_eq!(purchase.subscription_id.as_deref(), Some("sub_123"));
        assert!(purchase.organization.is_none());
    }

    #[test]
    fn multi_team_metadata_becomes_an_organization() {
        let payload = checkout_event(
            "cs_org",
            "director@club.org",
            50_000,
            json!({
                "seat_count": "60",
                "number_of_teams": "3",
                "organization_name": "Riverside",
                "seats_per_team": "[10, 20, 30]"
            }),
        );

        let StripeEvent::CheckoutCompleted(purchase) = parse_event(&payload).unwrap() else {
            panic!("esperava checkout");
        };
        let org = purchase.organization.unwrap();
        assert_eq!(org.organization_name, "Riverside");
        assert_eq!(org.number_of_teams, 3);
        assert_eq!(org.seats_per_team, Some(vec![10, 20, 30]));
    }

    #[test]
    fn seats_per_team_accepts_both_formats() {
        assert_eq!(parse_seats_per_team("5, 10,15").unwrap(), vec![5, 10, 15]);
        assert_eq!(parse_seats_per_team("[5,10,15]").unwrap(), vec![5, 10, 15]);
        assert!(parse_seats_per_team("5,x").is_err());
    }

    #[test]
    fn missing_seat_count_is_invalid() {
        let payload = checkout_event("cs_1", "a@b.org", 1000, json!({}));
        assert!(matches!(parse_event(&payload), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn subscription_events_map_to_grant_status() {
        let updated = json!({
            "id": "evt_2",
            "type": "customer.subscription.updated",
            "data": { "object": { "id": "sub_9", "status": "past_due" } }
        });
        assert_eq!(
            parse_event(updated.to_string().as_bytes()).unwrap(),
            StripeEvent::SubscriptionChanged {
                subscription_id: "sub_9".into(),
                status: SubscriptionStatus::Inactive
            }
        );

        let deleted = json!({
            "id": "evt_3",
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_9", "status": "canceled" } }
        });
        assert!(matches!(
            parse_event(deleted.to_string().as_bytes()).unwrap(),
            StripeEvent::SubscriptionChanged { status: SubscriptionStatus::Cancelled, .. }
        ));
    }

    #[test]
    fn other_event_types_are_ignored() {
        let event = json!({ "id": "evt_4", "type": "invoice.paid", "data": { "object": {} } });
        assert_eq!(
            parse_event(event.to_string().as_bytes()).unwrap(),
            StripeEvent::Ignored { event_type: "invoice.paid".into() }
        );
    }
}
