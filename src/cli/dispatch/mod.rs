//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary runs, which today is
//! always the API server with its full configuration.

use crate::api::Environment;
use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{collaborators, otp, ARG_ENVIRONMENT, ARG_FRONTEND_BASE_URL, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let environment = matches
        .get_one::<Environment>(ARG_ENVIRONMENT)
        .copied()
        .unwrap_or(Environment::Development);
    let frontend_base_url = matches
        .get_one::<String>(ARG_FRONTEND_BASE_URL)
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    let otp = otp::Options::parse(matches)?;
    let collaborators = collaborators::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        environment,
        frontend_base_url,
        otp,
        collaborators,
    }))
}
