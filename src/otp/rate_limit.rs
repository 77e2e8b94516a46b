//! Rate limiting primitives for code issuance.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use super::clock::Clock;
use super::store::normalize_email;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    PasswordResetRequest,
    EmailVerificationRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_email(&self, _email: &str, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

#[derive(Clone, Copy, Debug)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

/// Fixed-window limiter: `limit` requests per email and action per `window`.
pub struct WindowRateLimiter {
    limit: u32,
    window: chrono::Duration,
    clock: Arc<dyn Clock>,
    windows: DashMap<(RateLimitAction, String), Window>,
}

impl WindowRateLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit: limit.max(1),
            window: chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
            clock,
            windows: DashMap::new(),
        }
    }

    /// Forget windows that have already closed.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now < window.started_at + self.window);
        before.saturating_sub(self.windows.len())
    }
}

impl RateLimiter for WindowRateLimiter {
    fn check_email(&self, email: &str, action: RateLimitAction) -> RateLimitDecision {
        let now = self.clock.now();
        let mut window = self
            .windows
            .entry((action, normalize_email(email)))
            .or_insert(Window {
                started_at: now,
                count: 0,
            });

        if now >= window.started_at + self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.limit {
            return RateLimitDecision::Limited;
        }
        window.count += 1;
        RateLimitDecision::Allowed
    }
}
