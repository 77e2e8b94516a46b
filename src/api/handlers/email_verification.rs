//! Email verification endpoints for pending accounts.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::types::{RequestVerificationRequest, VerifyCodeRequest, VerifyResponse};
use super::{issue_rejection, require_email, verify_rejection};
use crate::api::email::{deliver, MailTemplate};
use crate::api::state::AppState;
use crate::otp::rate_limit::{RateLimitAction, RateLimitDecision};

#[utoipa::path(
    post,
    path = "/v1/email-verification/request",
    request_body = RequestVerificationRequest,
    responses(
        (status = 204, description = "Verification code sent"),
        (status = 400, description = "Missing or invalid input", body = String),
        (status = 429, description = "Too many requests", body = String),
        (status = 502, description = "Mail provider failed", body = String),
        (status = 503, description = "Code store unavailable", body = String)
    ),
    tag = "email-verification"
)]
pub async fn request_email_verification(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RequestVerificationRequest>>,
) -> impl IntoResponse {
    let request: RequestVerificationRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = match require_email(&request.email) {
        Ok(email) => email,
        Err(rejection) => return rejection.into_response(),
    };

    if state
        .rate_limiter()
        .check_email(&email, RateLimitAction::EmailVerificationRequest)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_string()).into_response();
    }

    let store = state.email_verification();
    let record = match store.issue_for(&email, &request.account_id) {
        Ok(record) => record,
        Err(err) => return issue_rejection(&err),
    };

    if let Err(err) = deliver(state.mailer(), MailTemplate::EmailVerification, &record).await {
        error!("Failed to deliver verification code: {err:#}");
        store.delete_if_current(&email, &record);
        return (StatusCode::BAD_GATEWAY, "Failed to deliver code".to_string()).into_response();
    }

    info!(email = %email, expires_at = %record.expires_at, "verification code issued");
    StatusCode::NO_CONTENT.into_response()
}

/// Verify the code and confirm the bound account.
#[utoipa::path(
    post,
    path = "/v1/email-verification/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Email verified", body = VerifyResponse),
        (status = 400, description = "Code rejected", body = VerifyResponse),
        (status = 429, description = "Too many attempts", body = VerifyResponse),
        (status = 502, description = "Identity backend failed", body = String)
    ),
    tag = "email-verification"
)]
pub async fn verify_email(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<VerifyCodeRequest>>,
) -> impl IntoResponse {
    let request: VerifyCodeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let store = state.email_verification();
    let verified = match store.verify(&request.email, &request.code) {
        Ok(verified) => verified,
        Err(err) => {
            debug!(reason = err.kind(), "verification code rejected");
            return verify_rejection(&err, store.config().max_attempts());
        }
    };

    let Some(account_id) = verified.account_id else {
        // Records in this store are always issued with an account.
        error!(email = %verified.email, "verification record has no account");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Verification failed".to_string())
            .into_response();
    };

    if let Err(err) = state.identity().confirm_account(&account_id).await {
        error!("Failed to confirm account: {err:#}");
        return (StatusCode::BAD_GATEWAY, "Failed to confirm account".to_string())
            .into_response();
    }

    // A code reissued while confirming belongs to a newer request.
    store.delete_if_current(&verified.email, &verified.record);
    info!(email = %verified.email, account_id = %account_id, "email verified");
    (StatusCode::OK, Json(VerifyResponse::valid(Some(account_id)))).into_response()
}
