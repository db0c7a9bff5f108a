use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};

/// Sliding-window rate limiter: at most `max_calls` call starts within any
/// rolling `period`.
///
/// Call starts are recorded as timestamps; a call that would exceed the
/// window sleeps until the oldest recorded start falls out of it. The wait
/// is a suspension point, never a busy loop, so the pipeline cannot hang
/// past the window's bound.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, period: Duration) -> RateLimiter {
        RateLimiter {
            max_calls,
            period,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until the window admits another call, then record its start.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut starts = self.starts.lock().await;
                let now = Instant::now();

                while let Some(&oldest) = starts.front() {
                    if now.duration_since(oldest) >= self.period {
                        starts.pop_front();
                    } else {
                        break;
                    }
                }

                if starts.len() < self.max_calls {
                    starts.push_back(now);
                    return;
                }

                match starts.front() {
                    Some(&oldest) => oldest + self.period - now,
                    None => {
                        starts.push_back(now);
                        return;
                    }
                }
            };
            // The lock is released before sleeping.
            time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_calls_within_window_admitted_immediately() {
        let limiter = RateLimiter::new(15, Duration::from_secs(60));
        let t0 = Instant::now();
        for _ in 0..15 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now().duration_since(t0), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixteenth_call_waits_for_oldest_start() {
        let limiter = RateLimiter::new(15, Duration::from_secs(60));
        let t0 = Instant::now();
        for _ in 0..15 {
            limiter.acquire().await;
        }
        limiter.acquire().await;
        assert!(Instant::now().duration_since(t0) >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_with_oldest_call() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let t0 = Instant::now();
        limiter.acquire().await;
        time::sleep(Duration::from_secs(4)).await;
        limiter.acquire().await;
        // Third call is admitted once the first start leaves the window,
        // at t0 + 10s, not t0 + 14s.
        limiter.acquire().await;
        let elapsed = Instant::now().duration_since(t0);
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_secs(14));
    }
}
