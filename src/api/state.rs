//! Shared application state owned by the composition root.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use utoipa::ToSchema;

use super::{email::MailSender, identity::IdentityBackend};
use crate::otp::{rate_limit::RateLimiter, OtpStore};

/// Deployment environment. Diagnostics are inert in `Production`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("invalid environment: {other}")),
        }
    }
}

/// Which verification flow a store belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    PasswordReset,
    EmailVerification,
}

pub struct AppState {
    environment: Environment,
    password_reset: Arc<OtpStore>,
    email_verification: Arc<OtpStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    mailer: Arc<dyn MailSender>,
    identity: Arc<dyn IdentityBackend>,
}

impl AppState {
    pub fn new(
        environment: Environment,
        password_reset: Arc<OtpStore>,
        email_verification: Arc<OtpStore>,
        rate_limiter: Arc<dyn RateLimiter>,
        mailer: Arc<dyn MailSender>,
        identity: Arc<dyn IdentityBackend>,
    ) -> Self {
        Self {
            environment,
            password_reset,
            email_verification,
            rate_limiter,
            mailer,
            identity,
        }
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn store(&self, flow: Flow) -> &OtpStore {
        match flow {
            Flow::PasswordReset => &self.password_reset,
            Flow::EmailVerification => &self.email_verification,
        }
    }

    #[must_use]
    pub fn password_reset(&self) -> &OtpStore {
        &self.password_reset
    }

    #[must_use]
    pub fn email_verification(&self) -> &OtpStore {
        &self.email_verification
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    pub(crate) fn mailer(&self) -> &dyn MailSender {
        self.mailer.as_ref()
    }

    pub(crate) fn identity(&self) -> &dyn IdentityBackend {
        self.identity.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_aliases() {
        assert_eq!("prod".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(
            " Development ".parse::<Environment>(),
            Ok(Environment::Development)
        );
        assert_eq!("staging".parse::<Environment>(), Ok(Environment::Staging));
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn only_production_is_production() {
        assert!(Environment::Production.is_production());
        assert!(!Environment::Staging.is_production());
        assert_eq!(Environment::Staging.to_string(), "staging");
    }
}
