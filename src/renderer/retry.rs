//! Exponential backoff for source page renders.
//!
//! Each attempt gets its own page and its own timeout via [`render_page`].
//!
//! # Backoff Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use super::{GotoOptions, RenderError, Renderer, render_page};
use rand::{Rng, rng};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts made after the first one fails.
    pub max_retries: usize,
    /// Initial delay between attempts (doubles with each attempt).
    pub base_delay: Duration,
    /// Cap applied before jitter.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

/// Render `url`, retrying failed attempts with backoff.
///
/// Returns the last error once `policy.max_retries` extra attempts have failed.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn render_with_retry<R: Renderer>(
    renderer: &R,
    url: &str,
    options: &GotoOptions,
    policy: &RetryPolicy,
) -> Result<String, RenderError> {
    let total_t0 = Instant::now();
    let mut attempt = 0usize;

    loop {
        match render_page(renderer, url, options).await {
            Ok(html) => return Ok(html),
            Err(e) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    error!(
                        attempt,
                        max = policy.max_retries,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                        error = %e,
                        "render exhausted retries"
                    );
                    return Err(e);
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max = policy.max_retries,
                    ?delay,
                    error = %e,
                    "render attempt failed; backing off"
                );
                sleep(delay).await;
            }
        }
    }
}
