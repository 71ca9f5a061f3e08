use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

/// Fixed-interval pacing for one external dependency. Each caller holds
/// its own limiter (scrape target, generation backend, batch loop); the
/// first acquisition is free, every later one waits out the remainder of
/// the interval since the previous request.
///
/// Built on `tokio::time` so tests can pause and advance the clock
/// instead of really sleeping.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Waits until the interval since the previous acquisition has
    /// elapsed, then marks this acquisition.
    pub async fn acquire(&mut self) {
        if let Some(last) = self.last {
            let ready_at = last + self.interval;
            let now = Instant::now();
            if ready_at > now {
                debug!("rate limiter waiting {:?}", ready_at - now);
                sleep_until(ready_at).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_acquire_is_immediate() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_acquire_waits_out_the_interval() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_interval_does_not_wait() {
        let mut limiter = RateLimiter::new(Duration::from_secs(2));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        let start = Instant::now();
        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
