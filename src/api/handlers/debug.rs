//! Diagnostic listing and lookup of stored codes.
//!
//! Both handlers answer 404 in production so the routes reveal nothing there.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::types::{CodeListResponse, LookupQuery};
use crate::api::state::{AppState, Flow};
use crate::otp::OtpSnapshot;

fn unavailable() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "unavailable" }))).into_response()
}

#[utoipa::path(
    get,
    path = "/v1/debug/otp/{flow}",
    params(("flow" = Flow, Path, description = "Verification flow")),
    responses(
        (status = 200, description = "All stored codes, newest first", body = CodeListResponse),
        (status = 404, description = "Diagnostics are disabled")
    ),
    tag = "debug"
)]
pub async fn list_codes(
    state: Extension<Arc<AppState>>,
    Path(flow): Path<Flow>,
) -> impl IntoResponse {
    if state.environment().is_production() {
        return unavailable();
    }

    let records = state.store(flow).list_all();
    warn!(?flow, count = records.len(), "diagnostic code listing served");
    Json(CodeListResponse {
        flow,
        count: records.len(),
        records,
    })
    .into_response()
}

#[utoipa::path(
    get,
    path = "/v1/debug/otp/{flow}/{email}",
    params(
        ("flow" = Flow, Path, description = "Verification flow"),
        ("email" = String, Path, description = "Email the code was issued to"),
        LookupQuery
    ),
    responses(
        (status = 200, description = "Stored code", body = OtpSnapshot),
        (status = 404, description = "No live code, or diagnostics are disabled")
    ),
    tag = "debug"
)]
pub async fn lookup_code(
    state: Extension<Arc<AppState>>,
    Path((flow, email)): Path<(Flow, String)>,
    Query(query): Query<LookupQuery>,
) -> impl IntoResponse {
    if state.environment().is_production() {
        return unavailable();
    }

    let store = state.store(flow);
    let snapshot = if query.raw {
        store.get_raw(&email)
    } else {
        store.get(&email).map(|record| OtpSnapshot {
            record,
            expired: false,
        })
    };

    match snapshot {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" }))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{harness, known, Harness, RecordingMailer};
    use super::*;
    use crate::api::state::Environment;
    use anyhow::Result;
    use axum::body::to_bytes;
    use serde_json::Value;

    fn setup(environment: Environment) -> Harness {
        harness(environment, RecordingMailer::default(), known(&[]))
    }

    async fn body_json(response: Response) -> Result<Value> {
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn lookup(h: &Harness, email: &str, raw: bool) -> Response {
        lookup_code(
            Extension(h.state.clone()),
            Path((Flow::PasswordReset, email.to_string())),
            Query(LookupQuery { raw }),
        )
        .await
        .into_response()
    }

    #[tokio::test]
    async fn listing_is_inert_in_production() -> Result<()> {
        let h = setup(Environment::Production);
        h.state.password_reset().issue("a@b.com")?;

        let response = list_codes(Extension(h.state.clone()), Path(Flow::PasswordReset))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await?, json!({ "error": "unavailable" }));

        let response = lookup(&h, "a@b.com", true).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await?, json!({ "error": "unavailable" }));
        Ok(())
    }

    #[tokio::test]
    async fn listing_returns_flow_records() -> Result<()> {
        let h = setup(Environment::Staging);
        h.state.password_reset().issue("a@b.com")?;
        h.state.password_reset().issue("c@d.com")?;
        h.state.email_verification().issue_for("e@f.com", "acct-1")?;

        let response = list_codes(Extension(h.state.clone()), Path(Flow::PasswordReset))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await?;
        assert_eq!(value["flow"], "password_reset");
        assert_eq!(value["count"], 2);
        Ok(())
    }

    #[tokio::test]
    async fn lookup_hides_expired_unless_raw() -> Result<()> {
        let h = setup(Environment::Development);
        let record = h.state.password_reset().issue("a@b.com")?;

        let value = body_json(lookup(&h, "A@B.com", false).await).await?;
        assert_eq!(value["code"], record.code.as_str());
        assert_eq!(value["expired"], false);

        h.clock.advance(chrono::Duration::minutes(11));
        assert_eq!(lookup(&h, "a@b.com", false).await.status(), StatusCode::NOT_FOUND);

        let response = lookup(&h, "a@b.com", true).await;
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await?;
        assert_eq!(value["expired"], true);
        Ok(())
    }

    #[tokio::test]
    async fn lookup_agrees_with_verify_at_expiry() -> Result<()> {
        let h = setup(Environment::Development);
        let record = h.state.password_reset().issue("a@b.com")?;
        h.clock.set(record.expires_at);

        assert_eq!(lookup(&h, "a@b.com", false).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            h.state.password_reset().verify("a@b.com", &record.code),
            Err(crate::otp::OtpError::Expired)
        );
        Ok(())
    }
}
