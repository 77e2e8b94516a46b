//! # Passcode (OTP issuance and verification)
//!
//! `passcode` proves control of an email address with short-lived numeric
//! one-time passcodes. Two flows of the investment-club platform share it:
//!
//! - **Password reset:** request a code, verify it, then change the
//!   credential exactly once through the identity backend.
//! - **Email verification:** request a code bound to a pending account, verify
//!   it, and the account is confirmed in the identity backend.
//!
//! ## Store model
//!
//! Each flow owns an [`otp::OtpStore`]: at most one outstanding code per
//! normalized email, a TTL checked lazily on every read, a cap on failed
//! attempts and a single-use gate once a code has been verified. Issuing a new
//! code fully replaces the previous one.
//!
//! ## Collaborators
//!
//! Accounts, credentials and mail delivery live outside this service and are
//! reached through the `IdentityBackend` and `MailSender` traits in [`api`].
//!
//! ## Diagnostics
//!
//! `/v1/debug/otp/...` lists and inspects stored codes outside production. In
//! production those routes answer `404 {"error":"unavailable"}` without
//! touching the store.

pub mod api;
pub mod cli;
pub mod otp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
