//! Sliding-window rate limiter keyed by client address

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Number of tracked keys above which idle entries are swept
const SWEEP_THRESHOLD: usize = 10_000;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of requests allowed within the window
    pub max_requests: u32,
    /// Length of the sliding window
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    /// Rejected; the oldest request in the window expires after this long
    Limited { retry_after: Duration },
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    /// Request instants inside the current window, oldest first
    entries: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a request for `key` and decide whether it may proceed
    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut entries = self.entries.lock().await;
        let window = self.config.window;

        let hits = entries.entry(key.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= window)
        {
            hits.pop_front();
        }

        let decision = if hits.len() >= self.config.max_requests as usize {
            let retry_after = hits
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            info!("Rate limit exceeded for {}", key);
            Decision::Limited { retry_after }
        } else {
            hits.push_back(now);
            Decision::Allowed {
                remaining: self.config.max_requests - hits.len() as u32,
            }
        };

        if entries.len() > SWEEP_THRESHOLD {
            entries.retain(|_, hits| {
                hits.back()
                    .is_some_and(|latest| now.duration_since(*latest) < window)
            });
        }

        decision
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}
