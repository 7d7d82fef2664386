//! Rate-limit escape hatch for the fetch/refresh consumers (§4.3): once
//! `max_messages` deliveries land inside a rolling `window`, pause
//! consumption for `cool_off` before resuming. Grounded on
//! `fetcher/application_processor.py::check_and_trigger_cool_off`, but
//! actually sleeps out the cool-off and clears it afterwards, instead of
//! only logging the duration and leaving the flag set forever.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

struct Inner {
  window_started_at: Instant,
  count: u32,
}

pub struct RateLimiter {
  inner: Mutex<Inner>,
  max_messages: u32,
  window: Duration,
  cool_off: Duration,
}

impl RateLimiter {
  pub fn new(max_messages: u32, window: Duration, cool_off: Duration) -> Self {
    Self {
      inner: Mutex::new(Inner { window_started_at: Instant::now(), count: 0 }),
      max_messages,
      window,
      cool_off,
    }
  }

  /// Counts this delivery against the current window and, if it pushed the
  /// count past `max_messages`, sleeps out `cool_off` before returning so
  /// the next delivery resumes against a fresh window.
  pub async fn throttle(&self) {
    let sleep_for = {
      let mut inner = self.inner.lock().unwrap();
      let now = Instant::now();
      if now.duration_since(inner.window_started_at) >= self.window {
        inner.window_started_at = now;
        inner.count = 0;
      }
      inner.count += 1;
      if inner.count > self.max_messages {
        inner.window_started_at = now;
        inner.count = 0;
        Some(self.cool_off)
      } else {
        None
      }
    };

    if let Some(duration) = sleep_for {
      warn!(cool_off_secs = duration.as_secs(), "message rate limit exceeded, cooling off");
      tokio::time::sleep(duration).await;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn stays_quiet_under_the_limit() {
    let limiter = RateLimiter::new(3, Duration::from_secs(60), Duration::from_millis(50));
    let start = Instant::now();
    for _ in 0..3 {
      limiter.throttle().await;
    }
    assert!(start.elapsed() < Duration::from_millis(50));
  }

  #[tokio::test]
  async fn cools_off_once_the_window_is_exceeded() {
    let limiter = RateLimiter::new(2, Duration::from_secs(60), Duration::from_millis(30));
    limiter.throttle().await;
    limiter.throttle().await;
    let start = Instant::now();
    limiter.throttle().await;
    assert!(start.elapsed() >= Duration::from_millis(30));
  }

  #[tokio::test]
  async fn counter_resets_once_the_window_elapses() {
    let limiter = RateLimiter::new(1, Duration::from_millis(20), Duration::from_millis(50));
    limiter.throttle().await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    let start = Instant::now();
    limiter.throttle().await;
    assert!(start.elapsed() < Duration::from_millis(50));
  }
}
