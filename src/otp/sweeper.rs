//! Background reclamation of abandoned records.
//!
//! Correctness never depends on this task: every read path re-checks
//! `expires_at`. It only bounds memory held by codes nobody came back for.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::{rate_limit::WindowRateLimiter, store::OtpStore};

#[derive(Clone, Copy, Debug)]
pub struct SweeperConfig {
    interval: Duration,
    retention: Duration,
}

impl SweeperConfig {
    /// Sweep every 60s, keeping expired records one hour for audit listing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(60),
            retention: Duration::from_secs(60 * 60),
        }
    }

    #[must_use]
    pub fn with_interval_seconds(mut self, seconds: u64) -> Self {
        self.interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_retention_seconds(mut self, seconds: u64) -> Self {
        self.retention = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn retention(&self) -> Duration {
        self.retention
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one pass over every store and the limiter.
pub fn sweep_once(
    stores: &[Arc<OtpStore>],
    limiter: Option<&WindowRateLimiter>,
    retention: Duration,
) -> usize {
    let removed: usize = stores.iter().map(|store| store.sweep(retention)).sum();
    let pruned = limiter.map_or(0, WindowRateLimiter::prune);
    if removed > 0 || pruned > 0 {
        debug!(removed, pruned, "swept expired OTP state");
    }
    removed
}

/// Spawn the sweep loop; returns `None` when the interval is zero.
pub fn spawn_sweeper(
    stores: Vec<Arc<OtpStore>>,
    limiter: Option<Arc<WindowRateLimiter>>,
    config: SweeperConfig,
) -> Option<tokio::task::JoinHandle<()>> {
    if !config.is_enabled() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = interval(config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(&stores, limiter.as_deref(), config.retention());
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::{clock::ManualClock, config::OtpConfig};
    use anyhow::Result;
    use chrono::Utc;

    #[test]
    fn sweep_once_covers_every_store() -> Result<()> {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let reset = Arc::new(OtpStore::new(OtpConfig::new(), clock.clone()));
        let verify = Arc::new(OtpStore::new(OtpConfig::new(), clock.clone()));
        reset.issue("a@b.com")?;
        verify.issue("a@b.com")?;
        verify.issue("c@d.com")?;

        clock.advance(chrono::Duration::minutes(30));
        let removed = sweep_once(&[reset.clone(), verify.clone()], None, Duration::ZERO);
        assert_eq!(removed, 3);
        assert!(reset.is_empty() && verify.is_empty());
        Ok(())
    }

    #[test]
    fn zero_interval_disables_sweeper() {
        let config = SweeperConfig::new().with_interval_seconds(0);
        assert!(!config.is_enabled());
        assert!(spawn_sweeper(Vec::new(), None, config).is_none());
    }

    #[tokio::test]
    async fn sweeper_task_runs() -> Result<()> {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(OtpStore::new(OtpConfig::new(), clock.clone()));
        store.issue("a@b.com")?;
        clock.advance(chrono::Duration::minutes(30));

        let config = SweeperConfig::new()
            .with_interval_seconds(1)
            .with_retention_seconds(0);
        let handle = spawn_sweeper(vec![store.clone()], None, config)
            .ok_or_else(|| anyhow::anyhow!("sweeper disabled"))?;
        // The first tick of a tokio interval fires immediately.
        for _ in 0..50 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert!(store.is_empty());
        Ok(())
    }
}
