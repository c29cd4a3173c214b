//! Rate Limiter (Sliding Window)
//!
//! Bounds outbound actions per key to `max_calls` within a trailing `period`.
//! Waiters sleep exactly the computed remainder and re-check under the lock,
//! so concurrent acquirers cannot over-admit and nobody busy-spins.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::trace;

/// Default window: one minute
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// In-process sliding-window limiter keyed by logical action tag
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    period: Duration,
    history: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_calls` - Grants allowed per window; `0` disables limiting
    /// * `period` - Window length
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self {
            max_calls,
            period,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter allowing `calls` per minute
    pub fn per_minute(calls: u32) -> Self {
        Self::new(calls, DEFAULT_PERIOD)
    }

    pub fn is_disabled(&self) -> bool {
        self.max_calls == 0
    }

    /// Suspend until a grant for `key` is available, then record it
    pub async fn acquire(&self, key: &str) {
        if self.is_disabled() {
            return;
        }

        loop {
            let wait = {
                let mut history = self.history.lock().await;
                let now = Instant::now();
                let grants = history.entry(key.to_string()).or_default();

                while let Some(&oldest) = grants.front() {
                    if now.duration_since(oldest) >= self.period {
                        grants.pop_front();
                    } else {
                        break;
                    }
                }

                if grants.len() < self.max_calls as usize {
                    grants.push_back(now);
                    return;
                }

                match grants.front() {
                    Some(&oldest) => self.period.saturating_sub(now.duration_since(oldest)),
                    None => Duration::ZERO,
                }
            };

            trace!(key = %key, wait_ms = wait.as_millis() as u64, "Rate limited, waiting");
            sleep(wait).await;
        }
    }
}
