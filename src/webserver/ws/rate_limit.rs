/// Fixed-window submission rate limiter
///
/// One limiter per connection, owned by its reader; never suspends.
use std::time::{Duration, Instant};

use crate::chat::ChatError;
use crate::config::RateLimitConfig;

#[derive(Debug, Clone)]
pub struct RateLimiter {
    enabled: bool,
    limit: u32,
    window: Duration,
    count: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(cfg: &RateLimitConfig) -> Self {
        Self::starting_at(cfg, Instant::now())
    }

    pub fn starting_at(cfg: &RateLimitConfig, start: Instant) -> Self {
        Self {
            enabled: cfg.enabled,
            limit: cfg.max_messages,
            window: cfg.window(),
            count: 0,
            window_start: start,
        }
    }

    /// Admit one submission now
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    /// Admit one submission at `now`
    ///
    /// The window resets once more than `window` has passed since the last
    /// reset. Rejections do not count toward the limit.
    pub fn check_at(&mut self, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }

        if now.saturating_duration_since(self.window_start) > self.window {
            self.count = 0;
            self.window_start = now;
        }

        if self.count >= self.limit {
            return false;
        }

        self.count += 1;
        true
    }

    /// Error reported to a rejected submitter
    pub fn exceeded(&self) -> ChatError {
        ChatError::RateLimitExceeded {
            limit: self.limit,
            window_secs: self.window.as_secs(),
        }
    }
}
