pub mod collaborators;
pub mod logging;
pub mod otp;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

use crate::api::Environment;

pub const ARG_PORT: &str = "port";
pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[must_use]
pub fn validator_environment() -> ValueParser {
    ValueParser::from(|value: &str| value.parse::<Environment>())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("passcode")
        .about("One-time passcodes for password reset and email verification")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("PASSCODE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .short('e')
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment: development, staging, production")
                .long_help(
                    "Deployment environment: development, staging, production.\n\nIn production the code diagnostics routes answer 404 and Swagger UI is not mounted.",
                )
                .default_value("development")
                .env("PASSCODE_ENVIRONMENT")
                .value_parser(validator_environment()),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL allowed by CORS")
                .default_value("http://localhost:3000")
                .env("PASSCODE_FRONTEND_BASE_URL"),
        );

    let command = otp::with_args(command);
    let command = collaborators::with_args(command);
    logging::with_args(command)
}
