//! Password reset endpoints.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::types::{CompleteResetRequest, RequestCodeRequest, VerifyCodeRequest, VerifyResponse};
use super::{issue_rejection, require_email, verify_rejection};
use crate::api::email::{deliver, MailTemplate};
use crate::api::state::AppState;
use crate::otp::rate_limit::{RateLimitAction, RateLimitDecision};

const MIN_PASSWORD_LENGTH: usize = 8;

/// Send a reset code (always returns 204 for valid input to avoid user enumeration).
#[utoipa::path(
    post,
    path = "/v1/password-reset/request",
    request_body = RequestCodeRequest,
    responses(
        (status = 204, description = "Request accepted"),
        (status = 400, description = "Missing or invalid email", body = String),
        (status = 502, description = "Identity or mail provider failed", body = String),
        (status = 503, description = "Code store unavailable", body = String)
    ),
    tag = "password-reset"
)]
pub async fn request_password_reset(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RequestCodeRequest>>,
) -> impl IntoResponse {
    let request: RequestCodeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = match require_email(&request.email) {
        Ok(email) => email,
        Err(rejection) => return rejection.into_response(),
    };

    if state
        .rate_limiter()
        .check_email(&email, RateLimitAction::PasswordResetRequest)
        == RateLimitDecision::Limited
    {
        // Limited requests look exactly like accepted ones.
        debug!(email = %email, "password reset request rate limited");
        return StatusCode::NO_CONTENT.into_response();
    }

    match state.identity().find_account(&email).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            debug!(email = %email, "password reset requested for unknown email");
            return StatusCode::NO_CONTENT.into_response();
        }
        Err(err) => {
            error!("Failed to look up account: {err:#}");
            return (StatusCode::BAD_GATEWAY, "Request failed".to_string()).into_response();
        }
    }

    let store = state.password_reset();
    let record = match store.issue(&email) {
        Ok(record) => record,
        Err(err) => return issue_rejection(&err),
    };

    if let Err(err) = deliver(state.mailer(), MailTemplate::PasswordReset, &record).await {
        error!("Failed to deliver password reset code: {err:#}");
        store.delete_if_current(&email, &record);
        return (StatusCode::BAD_GATEWAY, "Failed to deliver code".to_string()).into_response();
    }

    info!(email = %email, expires_at = %record.expires_at, "password reset code issued");
    StatusCode::NO_CONTENT.into_response()
}

/// Check a reset code. A valid code authorizes one call to `complete`.
#[utoipa::path(
    post,
    path = "/v1/password-reset/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Code accepted", body = VerifyResponse),
        (status = 400, description = "Code rejected", body = VerifyResponse),
        (status = 429, description = "Too many attempts", body = VerifyResponse)
    ),
    tag = "password-reset"
)]
pub async fn verify_password_reset(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<VerifyCodeRequest>>,
) -> impl IntoResponse {
    let request: VerifyCodeRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let store = state.password_reset();
    match store.verify(&request.email, &request.code) {
        Ok(_) => (StatusCode::OK, Json(VerifyResponse::valid(None))).into_response(),
        Err(err) => {
            debug!(reason = err.kind(), "password reset code rejected");
            verify_rejection(&err, store.config().max_attempts())
        }
    }
}

/// Set a new password after a successful verify; consumes the code.
#[utoipa::path(
    post,
    path = "/v1/password-reset/complete",
    request_body = CompleteResetRequest,
    responses(
        (status = 204, description = "Password updated"),
        (status = 400, description = "Invalid input", body = String),
        (status = 403, description = "No verified code for this email", body = String),
        (status = 502, description = "Identity backend failed", body = String)
    ),
    tag = "password-reset"
)]
pub async fn complete_password_reset(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<CompleteResetRequest>>,
) -> impl IntoResponse {
    let request: CompleteResetRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = match require_email(&request.email) {
        Ok(email) => email,
        Err(rejection) => return rejection.into_response(),
    };

    if request.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return (
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        )
            .into_response();
    }
    let new_password = SecretString::from(request.new_password);

    // Taking the record is the single-use gate for the credential change.
    let Some(record) = state.password_reset().take_verified(&email) else {
        return (StatusCode::FORBIDDEN, "Code not verified".to_string()).into_response();
    };

    if let Err(err) = state
        .identity()
        .update_credential(&record.email, &new_password)
        .await
    {
        error!("Failed to update credential: {err:#}");
        return (
            StatusCode::BAD_GATEWAY,
            "Failed to update password".to_string(),
        )
            .into_response();
    }

    info!(email = %email, "password reset completed");
    StatusCode::NO_CONTENT.into_response()
}
