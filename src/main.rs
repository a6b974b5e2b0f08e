//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::middleware::auth::admin_guard;

/// Monta o router completo: rotas públicas, painel protegido e Swagger.
pub fn app(app_state: AppState) -> Router {
    // Rotas do painel (protegidas pelo middleware)
    let admin_routes = Router::new()
        .route("/codes", get(handlers::codes::list_codes))
        .route("/codes/pairs", post(handlers::codes::create_code_pair))
        .route("/codes/{id}/active", patch(handlers::codes::set_code_active))
        .route("/organizations", post(handlers::organizations::create_organization))
        .route("/organizations/{id}/teams", get(handlers::organizations::list_teams))
        .route("/grants/{id}", get(handlers::organizations::get_grant))
        .route(
            "/partners",
            post(handlers::finder_fees::create_partner).get(handlers::finder_fees::list_partners),
        )
        .route(
            "/partners/{code}/earnings",
            get(handlers::finder_fees::partner_earnings),
        )
        .route(
            "/finder-fees",
            post(handlers::finder_fees::create_finder_fee)
                .get(handlers::finder_fees::list_finder_fees),
        )
        .route(
            "/finder-fees/{id}/status",
            patch(handlers::finder_fees::update_finder_fee_status),
        )
        .route(
            "/promo-codes",
            post(handlers::promos::create_promo).get(handlers::promos::list_promos),
        )
        .route(
            "/promo-codes/{id}/active",
            patch(handlers::promos::set_promo_active),
        )
        .route(
            "/trials",
            post(handlers::trials::grant_trial).get(handlers::trials::list_trials),
        )
        .route("/trials/{id}/extend", post(handlers::trials::extend_trial))
        .route("/trials/{id}/revoke", post(handlers::trials::revoke_trial))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            admin_guard,
        ));

    // O login fica fora do guardião
    let admin_public = Router::new().route("/login", post(handlers::auth::admin_login));

    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/pricing/quote", get(handlers::pricing::quote))
        .route("/api/promo-codes/{code}", get(handlers::promos::validate_promo))
        .route("/api/codes/redeem", post(handlers::codes::redeem_code))
        .route("/api/webhooks/stripe", post(handlers::webhooks::stripe_webhook))
        .nest("/api/admin", admin_public.merge(admin_routes))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app(app_state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        config::testing::{app_state, WEBHOOK_SECRET},
        db::{LedgerStore, MemoryLedgerStore},
        services::{
            auth::testing::ADMIN_PASSWORD,
            email_service::testing::RecordingMailer,
            stripe::{fixtures::checkout_event, sign_payload},
        },
    };

    fn test_app() -> (Router, std::sync::Arc<MemoryLedgerStore>, std::sync::Arc<RecordingMailer>) {
        let hash = bcrypt::hash(ADMIN_PASSWORD, 4).expect("hash de teste");
        let (state, store, mailer) = app_state(hash);
        (app(state), store, mailer)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn login(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/admin/login", None, json!({ "password": ADMIN_PASSWORD })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["token"].as_str().unwrap().to_string()
    }

    fn webhook(payload: Vec<u8>, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/webhooks/stripe")
            .header("Stripe-Signature", signature)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_the_backend() {
        let (app, _, _) = test_app();
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["store"], "memory");
    }

    #[tokio::test]
    async fn pricing_quote_applies_the_seat_tier() {
        let (app, _, _) = test_app();
        let response = app
            .clone()
            .oneshot(Request::get("/api/pricing/quote?seats=120").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["discountPercentage"], 15.0);
        assert_eq!(body["total"], 1020.0);

        let invalid = app
            .oneshot(Request::get("/api/pricing/quote?seats=0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let (app, _, _) = test_app();

        let response = app
            .clone()
            .oneshot(Request::get("/api/admin/codes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/admin/login", None, json!({ "password": "chute" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let token = login(&app).await;
        let response = app
            .oneshot(
                Request::get("/api/admin/codes")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn redeem_endpoint_distinguishes_capacity_from_missing() {
        let (app, _, _) = test_app();
        let token = login(&app).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/admin/codes/pairs",
                Some(&token),
                json!({ "seatCount": 1 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let member = body_json(response).await["member"]["code"]
            .as_str()
            .unwrap()
            .to_string();

        let redeem = |code: String| json_request("POST", "/api/codes/redeem", None, json!({ "code": code }));

        let first = app.clone().oneshot(redeem(member.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let full = app.clone().oneshot(redeem(member)).await.unwrap();
        assert_eq!(full.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(full).await["error"], "code_at_capacity");

        let missing = app
            .oneshot(redeem("TEAM-ZZZZ-ZZZZ-ZZZZ".into()))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn webhook_rejects_a_bad_signature() {
        let (app, store, _) = test_app();
        let payload = checkout_event("cs_1", "director@club.org", 120_000, json!({ "seat_count": "12" }));

        let response = app
            .oneshot(webhook(payload, "t=1700000000,v1=deadbeef"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!store.purchase_processed("cs_1").await.unwrap());
    }

    #[tokio::test]
    async fn signed_checkout_event_provisions_and_notifies() {
        let (app, store, mailer) = test_app();
        let token = login(&app).await;

        let partner = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/admin/partners",
                Some(&token),
                json!({ "finderCode": "ABC123", "name": "Coach Rivera", "email": "rivera@example.com" }),
            ))
            .await
            .unwrap();
        assert_eq!(partner.status(), StatusCode::CREATED);

        let payload = checkout_event(
            "cs_1",
            "director@club.org",
            120_000,
            json!({ "seat_count": "12", "team_name": "U12 Falcons", "finder_code": "ABC123" }),
        );
        let signature = sign_payload(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &payload).unwrap();

        let response = app.clone().oneshot(webhook(payload.clone(), &signature)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["event"], "purchase");
        assert_eq!(body["outcome"], "processed");
        assert_eq!(body["finderFee"]["feeAmount"], 120.0);

        assert!(store.purchase_processed("cs_1").await.unwrap());
        assert_eq!(store.finder_fee_count().await, 1);
        assert!(
            mailer
                .messages()
                .await
                .iter()
                .any(|m| m.to == "director@club.org")
        );

        // Reentrega do mesmo evento
        let replay = app.oneshot(webhook(payload, &signature)).await.unwrap();
        assert_eq!(replay.status(), StatusCode::OK);
        assert_eq!(body_json(replay).await["outcome"], "alreadyProcessed");
        assert_eq!(store.grant_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_manual_finder_fee_is_a_conflict() {
        let (app, _, _) = test_app();
        let token = login(&app).await;

        app.clone()
            .oneshot(json_request(
                "POST",
                "/api/admin/partners",
                Some(&token),
                json!({ "finderCode": "ABC123", "name": "Coach Rivera", "email": "rivera@example.com" }),
            ))
            .await
            .unwrap();

        let fee = || {
            json_request(
                "POST",
                "/api/admin/finder-fees",
                Some(&token),
                json!({
                    "finderCode": "ABC123",
                    "referredParty": "director@club.org",
                    "purchaseAmount": 500.0,
                    "seatCount": 5
                }),
            )
        };

        let first = app.clone().oneshot(fee()).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = app.oneshot(fee()).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(second).await["error"], "duplicate_finder_fee");
    }
}
