//! API handlers and shared helpers.
//!
//! Each flow composes one [`crate::otp::OtpStore`] with the mail and identity
//! collaborators held in [`crate::api::state::AppState`]:
//!
//! - `password_reset`: request → verify → complete (credential update).
//! - `email_verification`: request (bound to a pending account) → verify
//!   (account confirmation).
//! - `debug`: listing and lookup, inert in production.

pub mod debug;
pub mod email_verification;
pub mod health;
pub mod password_reset;
pub mod root;
pub mod types;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::otp::{normalize_email, valid_email, OtpError};
use types::VerifyResponse;

/// Normalize and check an email from a request body.
pub(crate) fn require_email(email: &str) -> Result<String, (StatusCode, String)> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing email".to_string()));
    }
    if !valid_email(&email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email".to_string()));
    }
    Ok(email)
}

/// Map a failed verification to its HTTP status and body.
pub(crate) fn verify_rejection(err: &OtpError, max_attempts: u32) -> Response {
    let status = match err {
        OtpError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
        OtpError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        OtpError::Validation(_)
        | OtpError::NotFound
        | OtpError::Expired
        | OtpError::AlreadyUsed
        | OtpError::Mismatch { .. } => StatusCode::BAD_REQUEST,
    };
    (status, Json(VerifyResponse::rejected(err, max_attempts))).into_response()
}

/// Map an issuance failure: bad input is the caller's fault, storage is ours.
pub(crate) fn issue_rejection(err: &OtpError) -> Response {
    if err.is_operational() {
        (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable".to_string()).into_response()
    } else {
        (StatusCode::BAD_REQUEST, err.to_string()).into_response()
    }
}
