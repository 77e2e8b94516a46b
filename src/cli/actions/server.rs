use crate::{
    api::{
        self,
        email::{LogMailSender, MailSender, WebhookMailSender},
        identity::{HttpIdentityBackend, IdentityBackend, LogIdentityBackend},
        state::AppState,
        Environment,
    },
    cli::commands::{collaborators, otp},
    otp::{rate_limit::WindowRateLimiter, sweeper, Clock, OtpStore, SystemClock},
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub environment: Environment,
    pub frontend_base_url: String,
    pub otp: otp::Options,
    pub collaborators: collaborators::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if a collaborator client cannot be built or the server
/// fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let otp_config = args.otp.otp_config();

    let password_reset = Arc::new(OtpStore::new(otp_config, clock.clone()));
    let email_verification = Arc::new(OtpStore::new(otp_config, clock.clone()));
    let rate_limiter = Arc::new(WindowRateLimiter::new(
        args.otp.request_limit,
        Duration::from_secs(args.otp.request_window_seconds),
        clock,
    ));

    let (mailer, identity) = collaborators(&args.collaborators, args.environment)?;

    let sweeper = sweeper::spawn_sweeper(
        vec![password_reset.clone(), email_verification.clone()],
        Some(rate_limiter.clone()),
        args.otp.sweeper_config(),
    );
    if sweeper.is_none() {
        debug!("expired code sweeper disabled");
    }

    let state = Arc::new(AppState::new(
        args.environment,
        password_reset,
        email_verification,
        rate_limiter,
        mailer,
        identity,
    ));

    let result = api::new(args.port, state, &args.frontend_base_url).await;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    result
}

type Collaborators = (Arc<dyn MailSender>, Arc<dyn IdentityBackend>);

fn collaborators(options: &collaborators::Options, environment: Environment) -> Result<Collaborators> {
    let timeout = Duration::from_secs(options.timeout_seconds);

    let mailer: Arc<dyn MailSender> = match &options.mail_webhook_url {
        Some(url) => Arc::new(WebhookMailSender::new(
            url.clone(),
            options.mail_api_key.clone(),
            timeout,
        )?),
        None => {
            if environment.is_production() {
                warn!("no mail webhook configured, codes are only logged");
            }
            Arc::new(LogMailSender)
        }
    };

    let identity: Arc<dyn IdentityBackend> = match &options.identity_url {
        Some(url) => Arc::new(HttpIdentityBackend::new(
            url.clone(),
            options.identity_api_key.clone(),
            timeout,
        )?),
        None => {
            if environment.is_production() {
                warn!("no identity backend configured, every email is accepted");
            }
            Arc::new(LogIdentityBackend)
        }
    };

    Ok((mailer, identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn options(mail: Option<&str>, identity: Option<&str>) -> Result<collaborators::Options> {
        Ok(collaborators::Options {
            mail_webhook_url: mail.map(Url::parse).transpose()?,
            mail_api_key: None,
            identity_url: identity.map(Url::parse).transpose()?,
            identity_api_key: None,
            timeout_seconds: 1,
        })
    }

    #[test]
    fn builds_logging_collaborators_by_default() -> Result<()> {
        let result = collaborators(&options(None, None)?, Environment::Development);
        assert!(result.is_ok());
        Ok(())
    }

    #[test]
    fn builds_http_collaborators_from_urls() -> Result<()> {
        let result = collaborators(
            &options(
                Some("https://mail.club.test/send"),
                Some("https://identity.club.test/api"),
            )?,
            Environment::Production,
        );
        assert!(result.is_ok());
        Ok(())
    }

    #[test]
    fn rejects_identity_url_without_base() -> Result<()> {
        let result = collaborators(
            &options(None, Some("mailto:ops@club.test"))?,
            Environment::Staging,
        );
        assert!(result.is_err());
        Ok(())
    }
}
