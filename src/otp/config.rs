use std::time::Duration;

const DEFAULT_TTL_SECONDS: u64 = 10 * 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_CODE_LENGTH: usize = 6;
const DEFAULT_MAX_RECORDS: usize = 100_000;
const MIN_CODE_LENGTH: usize = 4;
const MAX_CODE_LENGTH: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OtpConfig {
    ttl: Duration,
    max_attempts: u32,
    code_length: usize,
    max_records: usize,
}

impl OtpConfig {
    /// Default config: 10 minute TTL, 5 attempts, 6 digit codes and room for
    /// 100 000 outstanding records.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            code_length: DEFAULT_CODE_LENGTH,
            max_records: DEFAULT_MAX_RECORDS,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_code_length(mut self, code_length: usize) -> Self {
        self.code_length = code_length;
        self
    }

    #[must_use]
    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    /// Clamp values that would make every code unusable.
    #[must_use]
    pub fn normalize(self) -> Self {
        let ttl = if self.ttl.is_zero() {
            Duration::from_secs(1)
        } else {
            self.ttl
        };
        Self {
            ttl,
            max_attempts: self.max_attempts.max(1),
            code_length: self.code_length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH),
            max_records: self.max_records.max(1),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn code_length(&self) -> usize {
        self.code_length
    }

    #[must_use]
    pub fn max_records(&self) -> usize {
        self.max_records
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self::new()
    }
}
