use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// One outstanding code for one email address.
#[derive(ToSchema, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    /// Pending account the code confirms, set by the email-verification flow.
    pub account_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    /// A code is dead at and after `expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A stored record as seen by diagnostics, expired or not.
#[derive(ToSchema, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct OtpSnapshot {
    #[serde(flatten)]
    pub record: OtpRecord,
    pub expired: bool,
}

impl OtpSnapshot {
    pub(super) fn at(record: OtpRecord, now: DateTime<Utc>) -> Self {
        let expired = record.is_expired_at(now);
        Self { record, expired }
    }
}

/// Successful verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verified {
    pub email: String,
    pub account_id: Option<String>,
    /// The record as it stood right after verification.
    pub record: OtpRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Duration;

    fn record(now: DateTime<Utc>) -> OtpRecord {
        OtpRecord {
            email: "user@test.com".to_string(),
            code: "123456".to_string(),
            account_id: None,
            expires_at: now + Duration::minutes(10),
            verified: false,
            attempts: 0,
            created_at: now,
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let record = record(now);
        assert!(!record.is_expired_at(now));
        assert!(!record.is_expired_at(record.expires_at - Duration::seconds(1)));
        assert!(record.is_expired_at(record.expires_at));
    }

    #[test]
    fn snapshot_flattens_record_fields() -> Result<()> {
        let now = Utc::now();
        let snapshot = OtpSnapshot::at(record(now), now + Duration::minutes(11));
        let value = serde_json::to_value(&snapshot)?;
        assert_eq!(value["email"], "user@test.com");
        assert_eq!(value["expired"], true);
        assert_eq!(value["attempts"], 0);
        Ok(())
    }
}
