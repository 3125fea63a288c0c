use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;

/// Exponential backoff with up to 10% jitter, capped at `max_delay`.
///
/// Wraps every search-provider call. Citation providers deliberately do not
/// use it; they fall back to a synthetic answer instead of retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    /// Run `operation` until it succeeds or `max_attempts` is reached.
    ///
    /// The final error embeds `context`, the attempt count and the last
    /// underlying error. Attempts never overlap; the sleep between them is the
    /// only suspension point added here.
    pub async fn run<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    return Err(anyhow!(
                        "{context} failed after {max_attempts} attempts: {e:#}"
                    ));
                }
                Err(e) => {
                    let delay = self.delay_for(attempt, rand::random::<f64>());
                    warn!(
                        context,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %format!("{e:#}"),
                        "Attempt failed, retrying after backoff"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Delay after failed attempt `attempt` (1-based). `jitter_roll` in
    /// `[0, 1)` scales the 10% jitter band.
    pub fn delay_for(&self, attempt: u32, jitter_roll: f64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let exponential = self.base_delay.as_millis() as f64 * 2f64.powi(exponent);
        let jitter = jitter_roll.clamp(0.0, 1.0) * 0.1 * exponential;
        let capped = (exponential + jitter).min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1, 0.0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2, 0.0), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3, 0.0), Duration::from_millis(4000));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::default();
        let max = policy.delay_for(2, 0.999_999);
        assert!(max >= Duration::from_millis(2000));
        assert!(max <= Duration::from_millis(2200));
    }

    #[test]
    fn delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(10, 0.5), Duration::from_millis(30_000));
        assert_eq!(policy.delay_for(u32::MAX, 0.5), Duration::from_millis(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = RetryPolicy::default()
            .run("flaky op", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(anyhow!("transient {n}"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts_with_context() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = RetryPolicy::default()
            .run("Google SERP for \"weather\"", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("503 Service Unavailable"))
            })
            .await;

        let message = result.unwrap_err().to_string();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(message.contains("Google SERP for \"weather\""));
        assert!(message.contains("3 attempts"));
        assert!(message.contains("503 Service Unavailable"));
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts() {
        let start = tokio::time::Instant::now();
        let _: Result<()> = RetryPolicy::default()
            .run("always fails", || async { Err(anyhow!("nope")) })
            .await;
        // 1s + 2s of base backoff, plus at most 10% jitter each.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed <= Duration::from_millis(3300));
    }
}
