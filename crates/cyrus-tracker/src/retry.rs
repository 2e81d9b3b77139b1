//! Exponential backoff with full jitter, used to retry transient Tracker
//! errors. Same "Full Jitter" formula as the proxy reconnect backoff in
//! `cyrus-transport`: `delay = random(0, min(cap, base * 2^attempt))`.

use std::time::Duration;

/// Backoff calculator shared by the retry loop and the transport reconnect
/// loop.
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            attempt: 0,
        }
    }

    /// Compute the next delay with full jitter and advance the attempt.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self
            .base_ms
            .saturating_mul(1u64.checked_shl(self.attempt).unwrap_or(u64::MAX));
        let capped = exp.min(self.max_ms);
        let jittered = if capped == 0 { 0 } else { fastrand::u64(0..=capped) };
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(jittered)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Whether an HTTP status code should be retried.
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Run `op` up to `max_attempts` times, retrying on `Err(true)` (retryable)
/// and stopping immediately on `Err(false)` (non-retryable, e.g. auth).
///
/// Returns the last error's payload if every attempt was exhausted.
pub async fn retrying<T, E, F, Fut>(max_attempts: u32, base_ms: u64, max_delay_ms: u64, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, (E, bool)>>,
{
    let mut backoff = Backoff::new(base_ms, max_delay_ms);
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err((err, retryable)) => {
                if !retryable || backoff.attempt() + 1 >= max_attempts {
                    return Err(err);
                }
                let delay = backoff.next_delay();
                tracing::debug!(attempt = backoff.attempt(), delay_ms = delay.as_millis() as u64, "retrying tracker request");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_capped_at_max() {
        let mut b = Backoff::new(500, 5_000);
        for _ in 0..20 {
            assert!(b.next_delay() <= Duration::from_millis(5_000));
        }
    }

    #[test]
    fn reset_resets_attempt() {
        let mut b = Backoff::new(500, 60_000);
        for _ in 0..3 {
            let _ = b.next_delay();
        }
        assert_eq!(b.attempt(), 3);
        b.reset();
        assert_eq!(b.attempt(), 0);
    }

    #[tokio::test]
    async fn retrying_gives_up_on_non_retryable() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result: Result<(), &str> = retrying(5, 1, 2, || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err(("auth rejected", false)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retrying_stops_after_max_attempts() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result: Result<(), &str> = retrying(3, 1, 2, || {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err(("still failing", true)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retrying_succeeds_after_transient_failures() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let result: Result<&str, &str> = retrying(5, 1, 2, || {
            let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(("transient", true))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }
}
