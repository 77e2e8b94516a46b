/// Why an OTP operation did not succeed.
///
/// Everything except [`OtpError::Storage`] is an expected, user-facing
/// outcome that callers report as `valid: false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("No code requested")]
    NotFound,
    #[error("Code expired")]
    Expired,
    #[error("Code already used")]
    AlreadyUsed,
    #[error("Too many attempts")]
    TooManyAttempts,
    #[error("Incorrect code")]
    Mismatch { attempts: u32 },
    #[error("Storage unavailable: {0}")]
    Storage(String),
}

impl OtpError {
    /// Stable machine-readable reason.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::AlreadyUsed => "already_used",
            Self::TooManyAttempts => "too_many_attempts",
            Self::Mismatch { .. } => "mismatch",
            Self::Storage(_) => "storage",
        }
    }

    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_storage_is_operational() {
        let expected = [
            OtpError::Validation("Email is required"),
            OtpError::NotFound,
            OtpError::Expired,
            OtpError::AlreadyUsed,
            OtpError::TooManyAttempts,
            OtpError::Mismatch { attempts: 1 },
        ];
        assert!(expected.iter().all(|err| !err.is_operational()));
        assert!(OtpError::Storage("full".to_string()).is_operational());
    }

    #[test]
    fn messages_and_kinds() {
        assert_eq!(OtpError::NotFound.to_string(), "No code requested");
        assert_eq!(
            OtpError::Validation("Code is required").to_string(),
            "Code is required"
        );
        assert_eq!(OtpError::Mismatch { attempts: 2 }.kind(), "mismatch");
        assert_eq!(OtpError::TooManyAttempts.kind(), "too_many_attempts");
    }
}
