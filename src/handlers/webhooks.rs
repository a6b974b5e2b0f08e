use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    models::purchases::WebhookOutcome,
    services::stripe::parse_event,
};

// POST /api/webhooks/stripe
// O corpo é lido cru: a assinatura é calculada sobre os bytes exatos.
#[utoipa::path(
    post,
    path = "/api/webhooks/stripe",
    tag = "Webhooks",
    request_body(content = String, description = "Evento do Stripe (JSON cru)", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hmac>")),
    responses(
        (status = 200, description = "Evento processado ou ignorado", body = WebhookOutcome),
        (status = 400, description = "Assinatura inválida ou evento malformado")
    )
)]
pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, AppError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    app_state.webhook_verifier.verify(signature, &body)?;

    let event = parse_event(&body)?;
    let outcome = app_state.purchase_service.handle_event(event).await?;

    Ok(Json(outcome))
}
