//! Fixed-window request quotas.
//!
//! The engine sits behind a trait so a shared store can replace the in-process
//! map when the service runs on more than one node.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Length of one quota window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Entries beyond this count trigger a purge of expired windows.
const PRUNE_THRESHOLD: usize = 10_000;

/// Outcome of counting one request against a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request fits in the quota
    pub allowed: bool,
    /// Requests counted in the current window, this one included
    pub current: u32,
    /// Seconds until the window resets
    pub retry_after_secs: u64,
}

/// Counts requests per key.
#[async_trait]
pub trait RateLimiterEngine: Send + Sync {
    /// Counts one request for `key` and decides whether it is within `limit`.
    async fn check(&self, key: &str, limit: u32) -> RateDecision;
}

/// Process-local fixed-window limiter.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    inner: Mutex<HashMap<String, (u32, Instant)>>,
    window: Duration,
}

impl InMemoryRateLimiter {
    /// Limiter with the standard one-minute window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(WINDOW)
    }

    /// Limiter with a custom window length.
    #[must_use]
    pub fn with_window(window: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            window,
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimiterEngine for InMemoryRateLimiter {
    async fn check(&self, key: &str, limit: u32) -> RateDecision {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();

        if guard.len() > PRUNE_THRESHOLD {
            let window = self.window;
            guard.retain(|_, (_, started)| now.duration_since(*started) < window);
        }

        let entry = guard.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }
        entry.0 = entry.0.saturating_add(1);

        let remaining = self.window.saturating_sub(now.duration_since(entry.1));
        RateDecision {
            allowed: entry.0 <= limit,
            current: entry.0,
            retry_after_secs: remaining.as_secs().max(1),
        }
    }
}

/// Counts a request and turns an exceeded quota into [`Error::RateLimited`].
pub async fn enforce(limiter: &dyn RateLimiterEngine, key: &str, limit: u32) -> Result<()> {
    let decision = limiter.check(key, limit).await;
    if decision.allowed {
        return Ok(());
    }
    warn!(key, current = decision.current, limit, "Rate limit exceeded");
    Err(Error::RateLimited {
        retry_after_secs: decision.retry_after_secs,
    })
}
