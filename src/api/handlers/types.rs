//! Request/response types for OTP endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};

use crate::api::state::Flow;
use crate::otp::{OtpError, OtpSnapshot};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RequestVerificationRequest {
    pub email: String,
    pub account_id: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct CompleteResetRequest {
    pub email: String,
    pub new_password: String,
}

impl fmt::Debug for CompleteResetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompleteResetRequest")
            .field("email", &self.email)
            .field("new_password", &"[REDACTED]")
            .finish()
    }
}

/// Outcome of a verify call. Failures carry a stable `reason`.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
}

impl VerifyResponse {
    #[must_use]
    pub fn valid(account_id: Option<String>) -> Self {
        Self {
            valid: true,
            reason: None,
            message: None,
            account_id,
            attempts_remaining: None,
        }
    }

    #[must_use]
    pub fn rejected(err: &OtpError, max_attempts: u32) -> Self {
        let attempts_remaining = match err {
            OtpError::Mismatch { attempts } => Some(max_attempts.saturating_sub(*attempts)),
            _ => None,
        };
        Self {
            valid: false,
            reason: Some(err.kind().to_string()),
            message: Some(err.to_string()),
            account_id: None,
            attempts_remaining,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct CodeListResponse {
    pub flow: Flow,
    pub count: usize,
    pub records: Vec<OtpSnapshot>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct LookupQuery {
    /// Return the stored record even if it has expired.
    #[serde(default)]
    pub raw: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn complete_reset_debug_redacts_password() {
        let request = CompleteResetRequest {
            email: "a@b.com".to_string(),
            new_password: "correct horse".to_string(),
        };
        let rendered = format!("{request:?}");
        assert!(rendered.contains("a@b.com"));
        assert!(!rendered.contains("correct horse"));
    }

    #[test]
    fn rejected_response_reports_remaining_attempts() -> Result<()> {
        let response = VerifyResponse::rejected(&OtpError::Mismatch { attempts: 2 }, 5);
        assert_eq!(response.attempts_remaining, Some(3));
        let value = serde_json::to_value(&response)?;
        assert_eq!(value["valid"], false);
        assert_eq!(value["reason"], "mismatch");
        assert_eq!(value["message"], "Incorrect code");
        assert!(value.get("account_id").is_none());
        Ok(())
    }

    #[test]
    fn valid_response_omits_failure_fields() -> Result<()> {
        let value = serde_json::to_value(VerifyResponse::valid(Some("acct-1".to_string())))?;
        assert_eq!(value["valid"], true);
        assert_eq!(value["account_id"], "acct-1");
        assert!(value.get("reason").is_none());
        Ok(())
    }
}
