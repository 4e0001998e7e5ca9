// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for contact submissions.
//!
//! Each client key keeps the instants of its admitted submissions inside
//! the window. Purge, count and record happen under a single lock, so
//! concurrent submissions from one IP can never exceed the limit.

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed and has been recorded
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the oldest recorded hit leaves the window
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Rate limiting backend used by the gatekeeper.
///
/// A check that returns [`RateLimitResult::Allowed`] has already recorded
/// the hit; implementations must make check-and-record atomic per key.
#[async_trait]
pub trait RateLimit: Send + Sync {
    /// Check and record a hit for `key`.
    async fn check(&self, key: &str) -> RateLimitResult;

    /// Drop state that can no longer affect a decision.
    async fn cleanup(&self) {}
}

/// In-process sliding-window limiter.
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_limits(config.max_requests, config.window_duration())
    }

    pub fn with_limits(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests as usize,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.hits.lock().await.len()
    }

    fn purge(window: Duration, now: Instant, timestamps: &mut VecDeque<Instant>) {
        while let Some(oldest) = timestamps.front() {
            if now.duration_since(*oldest) >= window {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

#[async_trait]
impl RateLimit for SlidingWindowLimiter {
    async fn check(&self, key: &str) -> RateLimitResult {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let timestamps = hits.entry(key.to_string()).or_default();

        Self::purge(self.window, now, timestamps);

        if timestamps.len() >= self.max_requests {
            let retry_after = timestamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            debug!(key = %key, count = timestamps.len(), ?retry_after, "Rate limit exceeded");
            return RateLimitResult::Limited { retry_after };
        }

        timestamps.push_back(now);
        let remaining = (self.max_requests - timestamps.len()) as u32;
        debug!(key = %key, remaining, "Submission recorded");
        RateLimitResult::Allowed { remaining }
    }

    async fn cleanup(&self) {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let before = hits.len();
        hits.retain(|_, timestamps| {
            Self::purge(self.window, now, timestamps);
            !timestamps.is_empty()
        });
        let removed = before - hits.len();
        if removed > 0 {
            debug!(removed, remaining = hits.len(), "Expired rate limit keys removed");
        }
    }
}
