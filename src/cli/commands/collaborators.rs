use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_MAIL_WEBHOOK_URL: &str = "mail-webhook-url";
pub const ARG_MAIL_API_KEY: &str = "mail-api-key";
pub const ARG_IDENTITY_URL: &str = "identity-url";
pub const ARG_IDENTITY_API_KEY: &str = "identity-api-key";
pub const ARG_COLLABORATOR_TIMEOUT_SECONDS: &str = "collaborator-timeout-seconds";

/// Where mail and identity calls go. Unset URLs fall back to the logging
/// implementations used in local development.
#[derive(Debug, Clone)]
pub struct Options {
    pub mail_webhook_url: Option<Url>,
    pub mail_api_key: Option<SecretString>,
    pub identity_url: Option<Url>,
    pub identity_api_key: Option<SecretString>,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse collaborator arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a URL does not parse or the timeout is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Env vars set to "" should behave as if unset
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let mail_webhook_url = get_non_empty(ARG_MAIL_WEBHOOK_URL)
            .map(|value| Url::parse(&value))
            .transpose()
            .with_context(|| format!("invalid --{ARG_MAIL_WEBHOOK_URL}"))?;
        let identity_url = get_non_empty(ARG_IDENTITY_URL)
            .map(|value| Url::parse(&value))
            .transpose()
            .with_context(|| format!("invalid --{ARG_IDENTITY_URL}"))?;

        let timeout_seconds = matches
            .get_one::<u64>(ARG_COLLABORATOR_TIMEOUT_SECONDS)
            .copied()
            .unwrap_or(5);
        if timeout_seconds == 0 {
            anyhow::bail!("--{ARG_COLLABORATOR_TIMEOUT_SECONDS} must be greater than zero");
        }

        Ok(Self {
            mail_webhook_url,
            mail_api_key: get_non_empty(ARG_MAIL_API_KEY).map(SecretString::from),
            identity_url,
            identity_api_key: get_non_empty(ARG_IDENTITY_API_KEY).map(SecretString::from),
            timeout_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_MAIL_WEBHOOK_URL)
                .long(ARG_MAIL_WEBHOOK_URL)
                .help("Mail provider webhook that delivers codes (logs codes when unset)")
                .env("PASSCODE_MAIL_WEBHOOK_URL"),
        )
        .arg(
            Arg::new(ARG_MAIL_API_KEY)
                .long(ARG_MAIL_API_KEY)
                .help("Bearer key for the mail webhook")
                .env("PASSCODE_MAIL_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_IDENTITY_URL)
                .long(ARG_IDENTITY_URL)
                .help("Identity backend base URL (accepts every email when unset)")
                .env("PASSCODE_IDENTITY_URL"),
        )
        .arg(
            Arg::new(ARG_IDENTITY_API_KEY)
                .long(ARG_IDENTITY_API_KEY)
                .help("Service key for the identity backend")
                .env("PASSCODE_IDENTITY_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_COLLABORATOR_TIMEOUT_SECONDS)
                .long(ARG_COLLABORATOR_TIMEOUT_SECONDS)
                .help("Timeout in seconds for mail and identity calls")
                .env("PASSCODE_COLLABORATOR_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
}
