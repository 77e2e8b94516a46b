use clap::{Arg, ArgMatches, Command};

use crate::otp::{sweeper::SweeperConfig, OtpConfig};

pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_OTP_MAX_ATTEMPTS: &str = "otp-max-attempts";
pub const ARG_OTP_CODE_LENGTH: &str = "otp-code-length";
pub const ARG_OTP_MAX_RECORDS: &str = "otp-max-records";
pub const ARG_OTP_REQUEST_LIMIT: &str = "otp-request-limit";
pub const ARG_OTP_REQUEST_WINDOW_SECONDS: &str = "otp-request-window-seconds";
pub const ARG_OTP_SWEEP_INTERVAL_SECONDS: &str = "otp-sweep-interval-seconds";
pub const ARG_OTP_SWEEP_RETENTION_SECONDS: &str = "otp-sweep-retention-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub ttl_seconds: u64,
    pub max_attempts: u32,
    pub code_length: usize,
    pub max_records: usize,
    pub request_limit: u32,
    pub request_window_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub sweep_retention_seconds: u64,
}

impl Options {
    /// Parse code store arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value is missing or zero where zero makes no sense.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_u64 = |id: &str| {
            matches
                .get_one::<u64>(id)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        let ttl_seconds = get_u64(ARG_OTP_TTL_SECONDS)?;
        if ttl_seconds == 0 {
            anyhow::bail!("--{ARG_OTP_TTL_SECONDS} must be greater than zero");
        }

        let max_attempts = matches
            .get_one::<u32>(ARG_OTP_MAX_ATTEMPTS)
            .copied()
            .unwrap_or(5);
        if max_attempts == 0 {
            anyhow::bail!("--{ARG_OTP_MAX_ATTEMPTS} must be greater than zero");
        }

        Ok(Self {
            ttl_seconds,
            max_attempts,
            code_length: matches
                .get_one::<usize>(ARG_OTP_CODE_LENGTH)
                .copied()
                .unwrap_or(6),
            max_records: matches
                .get_one::<usize>(ARG_OTP_MAX_RECORDS)
                .copied()
                .unwrap_or(100_000),
            request_limit: matches
                .get_one::<u32>(ARG_OTP_REQUEST_LIMIT)
                .copied()
                .unwrap_or(5),
            request_window_seconds: get_u64(ARG_OTP_REQUEST_WINDOW_SECONDS)?,
            sweep_interval_seconds: get_u64(ARG_OTP_SWEEP_INTERVAL_SECONDS)?,
            sweep_retention_seconds: get_u64(ARG_OTP_SWEEP_RETENTION_SECONDS)?,
        })
    }

    #[must_use]
    pub fn otp_config(&self) -> OtpConfig {
        OtpConfig::new()
            .with_ttl_seconds(self.ttl_seconds)
            .with_max_attempts(self.max_attempts)
            .with_code_length(self.code_length)
            .with_max_records(self.max_records)
    }

    #[must_use]
    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig::new()
            .with_interval_seconds(self.sweep_interval_seconds)
            .with_retention_seconds(self.sweep_retention_seconds)
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_store_args(command);
    with_hygiene_args(command)
}

fn with_store_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("Seconds an issued code stays valid")
                .env("PASSCODE_OTP_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_OTP_MAX_ATTEMPTS)
                .long(ARG_OTP_MAX_ATTEMPTS)
                .help("Failed verifications allowed before a code is locked")
                .env("PASSCODE_OTP_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_OTP_CODE_LENGTH)
                .long(ARG_OTP_CODE_LENGTH)
                .help("Digits per code (4 to 10)")
                .env("PASSCODE_OTP_CODE_LENGTH")
                .default_value("6")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new(ARG_OTP_MAX_RECORDS)
                .long(ARG_OTP_MAX_RECORDS)
                .help("Outstanding codes held per flow before issuance fails")
                .env("PASSCODE_OTP_MAX_RECORDS")
                .default_value("100000")
                .value_parser(clap::value_parser!(usize)),
        )
}

fn with_hygiene_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OTP_REQUEST_LIMIT)
                .long(ARG_OTP_REQUEST_LIMIT)
                .help("Code requests allowed per email within the request window")
                .env("PASSCODE_OTP_REQUEST_LIMIT")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_OTP_REQUEST_WINDOW_SECONDS)
                .long(ARG_OTP_REQUEST_WINDOW_SECONDS)
                .help("Length of the per-email request window in seconds")
                .env("PASSCODE_OTP_REQUEST_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_OTP_SWEEP_INTERVAL_SECONDS)
                .long(ARG_OTP_SWEEP_INTERVAL_SECONDS)
                .help("Seconds between expired-code sweeps, 0 disables the sweeper")
                .env("PASSCODE_OTP_SWEEP_INTERVAL_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_OTP_SWEEP_RETENTION_SECONDS)
                .long(ARG_OTP_SWEEP_RETENTION_SECONDS)
                .help("How long expired codes stay listed before the sweeper drops them")
                .env("PASSCODE_OTP_SWEEP_RETENTION_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
}
