//! Sliding-window rate limiting for provider calls.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Limits calls to at most `max_calls` per sliding one-minute window.
///
/// `acquire` blocks (asynchronously) until a slot is free, then records the
/// call. Callers wrap provider invocations:
///
/// ```no_run
/// # async fn demo(limiter: &flowgraph_llm::RateLimiter) {
/// limiter.acquire().await;
/// // provider call here
/// # }
/// ```
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Allow at most `max_calls` per minute.
    pub fn per_minute(max_calls: usize) -> Self {
        Self {
            max_calls,
            window: Duration::from_secs(60),
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a call slot is available, then claim it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock().await;
                let now = Instant::now();
                while let Some(&front) = timestamps.front() {
                    if now.duration_since(front) >= self.window {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }
                if timestamps.len() < self.max_calls {
                    timestamps.push_back(now);
                    None
                } else {
                    // Oldest call ages out first; sleep until it does.
                    timestamps
                        .front()
                        .map(|&front| self.window - now.duration_since(front))
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    debug!(?delay, "rate limit reached, waiting");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn calls_within_limit_do_not_wait() {
        let limiter = RateLimiter::per_minute(3);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn excess_call_waits_for_window() {
        let limiter = RateLimiter::per_minute(2);
        limiter.acquire().await;
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }
}
