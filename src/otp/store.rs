use chrono::{DateTime, Utc};
use dashmap::DashMap;
use regex::Regex;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    clock::Clock,
    code::{codes_match, generate_code},
    config::OtpConfig,
    error::OtpError,
    record::{OtpRecord, OtpSnapshot, Verified},
};

/// Normalize an email for lookup/uniqueness checks.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
#[must_use]
pub fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

pub struct OtpStore {
    config: OtpConfig,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    records: DashMap<String, OtpRecord>,
    /// Held across the capacity check and insert so `max_records` is a hard cap.
    issuing: Mutex<()>,
}

impl OtpStore {
    #[must_use]
    pub fn new(config: OtpConfig, clock: Arc<dyn Clock>) -> Self {
        let config = config.normalize();
        let ttl = chrono::Duration::from_std(config.ttl())
            .unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            config,
            ttl,
            clock,
            records: DashMap::new(),
            issuing: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Issue a fresh code for `email`, replacing any outstanding record.
    ///
    /// # Errors
    /// `Validation` for a missing or malformed email, `Storage` when the store
    /// is full of live records.
    pub fn issue(&self, email: &str) -> Result<OtpRecord, OtpError> {
        self.issue_record(email, None)
    }

    /// Issue a fresh code bound to a pending account.
    ///
    /// # Errors
    /// Same as [`OtpStore::issue`], plus `Validation` for an empty account id.
    pub fn issue_for(&self, email: &str, account_id: &str) -> Result<OtpRecord, OtpError> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(OtpError::Validation("Account id is required"));
        }
        self.issue_record(email, Some(account_id.to_string()))
    }

    fn issue_record(
        &self,
        email: &str,
        account_id: Option<String>,
    ) -> Result<OtpRecord, OtpError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(OtpError::Validation("Email is required"));
        }
        if !valid_email(&email) {
            return Err(OtpError::Validation("Invalid email"));
        }

        let now = self.clock.now();
        let _issuing = self.issuing.lock().unwrap_or_else(PoisonError::into_inner);
        self.ensure_capacity(&email, now)?;

        let record = OtpRecord {
            email: email.clone(),
            code: generate_code(self.config.code_length()),
            account_id,
            expires_at: now + self.ttl,
            verified: false,
            attempts: 0,
            created_at: now,
        };

        // Full overwrite: a new code never inherits `verified` or `attempts`.
        self.records.insert(email, record.clone());

        Ok(record)
    }

    fn ensure_capacity(&self, email: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        if self.records.len() < self.config.max_records() || self.records.contains_key(email) {
            return Ok(());
        }

        let reclaimed = self.remove_expired_before(now);
        debug!(reclaimed, "reclaimed expired OTP records at capacity");

        if self.records.len() >= self.config.max_records() {
            warn!(
                max_records = self.config.max_records(),
                "OTP store is full of live records"
            );
            return Err(OtpError::Storage("OTP store capacity exhausted".to_string()));
        }
        Ok(())
    }

    /// Check `submitted_code` against the outstanding record for `email`.
    ///
    /// The whole check-and-mutate sequence runs under the entry lock, so two
    /// concurrent calls with the correct code cannot both succeed and two
    /// wrong guesses always count as two attempts.
    ///
    /// # Errors
    /// One of `Validation`, `NotFound`, `Expired`, `AlreadyUsed`,
    /// `TooManyAttempts` or `Mismatch`, in that order of precedence.
    pub fn verify(&self, email: &str, submitted_code: &str) -> Result<Verified, OtpError> {
        let email = normalize_email(email);
        let submitted_code = submitted_code.trim();
        if email.is_empty() {
            return Err(OtpError::Validation("Email is required"));
        }
        if submitted_code.is_empty() {
            return Err(OtpError::Validation("Code is required"));
        }

        let now = self.clock.now();
        let Some(mut record) = self.records.get_mut(&email) else {
            return Err(OtpError::NotFound);
        };

        if record.is_expired_at(now) {
            return Err(OtpError::Expired);
        }
        if record.verified {
            return Err(OtpError::AlreadyUsed);
        }
        if record.attempts >= self.config.max_attempts() {
            return Err(OtpError::TooManyAttempts);
        }
        if !codes_match(&record.code, submitted_code) {
            record.attempts = record.attempts.saturating_add(1);
            return Err(OtpError::Mismatch {
                attempts: record.attempts,
            });
        }

        record.verified = true;
        Ok(Verified {
            email: record.email.clone(),
            account_id: record.account_id.clone(),
            record: record.value().clone(),
        })
    }

    /// Lookup that agrees with `verify`: expired records are absent.
    #[must_use]
    pub fn get(&self, email: &str) -> Option<OtpRecord> {
        let now = self.clock.now();
        self.records
            .get(&normalize_email(email))
            .filter(|record| !record.is_expired_at(now))
            .map(|record| record.value().clone())
    }

    /// Raw lookup for audit tooling; expired records are returned and flagged.
    #[must_use]
    pub fn get_raw(&self, email: &str) -> Option<OtpSnapshot> {
        let now = self.clock.now();
        self.records
            .get(&normalize_email(email))
            .map(|record| OtpSnapshot::at(record.value().clone(), now))
    }

    /// Remove the record for `email`. Returns whether one was present.
    pub fn delete(&self, email: &str) -> bool {
        self.records.remove(&normalize_email(email)).is_some()
    }

    /// Remove the record for `email` only if it is still the issuance
    /// described by `record`. A code issued in the meantime is left alone.
    pub fn delete_if_current(&self, email: &str, record: &OtpRecord) -> bool {
        self.records
            .remove_if(&normalize_email(email), |_, stored| {
                stored.code == record.code && stored.created_at == record.created_at
            })
            .is_some()
    }

    /// Remove and return the record only if it has been verified and is
    /// still within its TTL.
    pub fn take_verified(&self, email: &str) -> Option<OtpRecord> {
        let now = self.clock.now();
        self.records
            .remove_if(&normalize_email(email), |_, record| {
                record.verified && !record.is_expired_at(now)
            })
            .map(|(_, record)| record)
    }

    /// Every stored record, newest first.
    #[must_use]
    pub fn list_all(&self) -> Vec<OtpSnapshot> {
        let now = self.clock.now();
        let mut snapshots: Vec<OtpSnapshot> = self
            .records
            .iter()
            .map(|entry| OtpSnapshot::at(entry.value().clone(), now))
            .collect();
        snapshots.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| a.record.email.cmp(&b.record.email))
        });
        snapshots
    }

    /// Drop records that have been expired for at least `retention`.
    pub fn sweep(&self, retention: Duration) -> usize {
        let retention =
            chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::zero());
        self.remove_expired_before(self.clock.now() - retention)
    }

    fn remove_expired_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired_at(cutoff);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
