//! End-to-end tests for the assembled router.
//!
//! The app is built exactly as the server builds it, with the logging mail
//! sender and identity backend. Codes are read back through the diagnostics
//! routes, which is what those routes exist for outside production.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use passcode::{
    api::{
        self,
        email::LogMailSender,
        identity::LogIdentityBackend,
        state::AppState,
        Environment,
    },
    otp::{rate_limit::WindowRateLimiter, ManualClock, OtpConfig, OtpStore},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

fn test_app(environment: Environment) -> Result<TestApp> {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = Arc::new(AppState::new(
        environment,
        Arc::new(OtpStore::new(OtpConfig::new(), clock.clone())),
        Arc::new(OtpStore::new(OtpConfig::new(), clock.clone())),
        Arc::new(WindowRateLimiter::new(
            2,
            std::time::Duration::from_secs(900),
            clock.clone(),
        )),
        Arc::new(LogMailSender),
        Arc::new(LogIdentityBackend),
    ));
    Ok(TestApp {
        router: api::app(state, "http://localhost:3000")?,
        clock,
    })
}

async fn send(app: &TestApp, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.router.clone().oneshot(request).await?;
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    Ok((status, value))
}

async fn post(app: &TestApp, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?;
    send(app, request).await
}

async fn get(app: &TestApp, uri: &str) -> Result<(StatusCode, Value)> {
    send(app, Request::builder().uri(uri).body(Body::empty())?).await
}

async fn issued_code(app: &TestApp, flow: &str, email: &str) -> Result<String> {
    let (status, value) = get(app, &format!("/v1/debug/otp/{flow}/{email}")).await?;
    assert_eq!(status, StatusCode::OK);
    value["code"]
        .as_str()
        .map(ToString::to_string)
        .context("lookup returned no code")
}

#[tokio::test]
async fn email_verification_round_trip() -> Result<()> {
    let app = test_app(Environment::Development)?;

    let (status, _) = post(
        &app,
        "/v1/email-verification/request",
        json!({ "email": " New.Member@Club.com ", "account_id": "acct-9" }),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let code = issued_code(&app, "email_verification", "new.member@club.com").await?;
    assert_eq!(code.len(), 6);

    let (status, value) = post(
        &app,
        "/v1/email-verification/verify",
        json!({ "email": "NEW.MEMBER@club.com", "code": code }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({ "valid": true, "account_id": "acct-9" }));

    // Confirmation consumes the code.
    let (status, _) = get(&app, "/v1/debug/otp/email_verification/new.member@club.com?raw=true").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn password_reset_lockout_then_expiry() -> Result<()> {
    let app = test_app(Environment::Staging)?;

    let (status, _) = post(&app, "/v1/password-reset/request", json!({ "email": "x@y.com" })).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let code = issued_code(&app, "password_reset", "x@y.com").await?;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for attempt in 1..=5 {
        let (status, value) = post(
            &app,
            "/v1/password-reset/verify",
            json!({ "email": "x@y.com", "code": wrong }),
        )
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["reason"], "mismatch");
        assert_eq!(value["attempts_remaining"], 5 - attempt);
    }

    let (status, value) = post(
        &app,
        "/v1/password-reset/verify",
        json!({ "email": "x@y.com", "code": code }),
    )
    .await?;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(value["reason"], "too_many_attempts");

    // A fresh code resets the attempt counter.
    post(&app, "/v1/password-reset/request", json!({ "email": "x@y.com" })).await?;
    let code = issued_code(&app, "password_reset", "x@y.com").await?;
    app.clock.advance(Duration::minutes(10));

    let (status, value) = post(
        &app,
        "/v1/password-reset/verify",
        json!({ "email": "x@y.com", "code": code }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["reason"], "expired");

    let (status, value) = get(&app, "/v1/debug/otp/password_reset").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["count"], 1);
    assert_eq!(value["records"][0]["expired"], true);
    Ok(())
}

#[tokio::test]
async fn reset_requests_are_rate_limited_silently() -> Result<()> {
    let app = test_app(Environment::Development)?;

    for _ in 0..2 {
        let (status, _) = post(&app, "/v1/password-reset/request", json!({ "email": "a@b.com" })).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let first = issued_code(&app, "password_reset", "a@b.com").await?;

    // Over the limit: same answer, no new code.
    let (status, _) = post(&app, "/v1/password-reset/request", json!({ "email": "a@b.com" })).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(issued_code(&app, "password_reset", "a@b.com").await?, first);
    Ok(())
}

#[tokio::test]
async fn complete_requires_verified_code() -> Result<()> {
    let app = test_app(Environment::Development)?;

    post(&app, "/v1/password-reset/request", json!({ "email": "a@b.com" })).await?;
    let (status, _) = post(
        &app,
        "/v1/password-reset/complete",
        json!({ "email": "a@b.com", "new_password": "long-enough-1" }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let code = issued_code(&app, "password_reset", "a@b.com").await?;
    post(&app, "/v1/password-reset/verify", json!({ "email": "a@b.com", "code": code })).await?;

    let (status, _) = post(
        &app,
        "/v1/password-reset/complete",
        json!({ "email": "a@b.com", "new_password": "long-enough-1" }),
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, "/v1/debug/otp/password_reset/a@b.com?raw=true").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn production_hides_diagnostics() -> Result<()> {
    let app = test_app(Environment::Production)?;
    post(&app, "/v1/password-reset/request", json!({ "email": "a@b.com" })).await?;

    let (status, value) = get(&app, "/v1/debug/otp/password_reset/a@b.com").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value, json!({ "error": "unavailable" }));
    Ok(())
}
