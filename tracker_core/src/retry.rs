//! Exponential backoff retry, generalized from the teacher's
//! `fechatter_core::services::retry::ExponentialBackoffRetry` to the
//! Notifier's §4.6 rule: honor a broker-provided `Retry-After` delay instead
//! of always computing one, and give up after `max_retries`.

use crate::error::TransportError;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
  pub base_delay_ms: u64,
  pub max_retries: u32,
  pub backoff_multiplier: f64,
  pub max_delay_ms: u64,
}

impl Default for ExponentialBackoffRetry {
  fn default() -> Self {
    Self {
      base_delay_ms: 1000,
      max_retries: 5,
      backoff_multiplier: 2.0,
      max_delay_ms: 30_000,
    }
  }
}

impl ExponentialBackoffRetry {
  pub fn new(base_delay_ms: u64, max_retries: u32) -> Self {
    Self {
      base_delay_ms,
      max_retries,
      ..Default::default()
    }
  }

  fn calculate_delay(&self, attempt: u32) -> Duration {
    let delay_ms = (self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32)) as u64;
    Duration::from_millis(delay_ms.min(self.max_delay_ms))
  }

  /// Run `operation` with retry. On `TransportError::RetryAfter`, honors the
  /// broker-provided delay in place of the computed backoff.
  pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, TransportError>
  where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, TransportError>> + Send,
    T: Send,
  {
    let mut last_error: Option<TransportError> = None;

    for attempt in 0..=self.max_retries {
      match operation().await {
        Ok(result) => return Ok(result),
        Err(error) => {
          if !error.is_retryable() {
            return Err(error);
          }
          if attempt == self.max_retries {
            return Err(error);
          }

          let delay = match error.retry_after_secs() {
            Some(secs) => Duration::from_secs(secs),
            None => self.calculate_delay(attempt),
          };
          tracing::warn!(
            attempt = attempt + 1,
            ?delay,
            "operation failed, retrying: {}",
            error
          );
          last_error = Some(error);
          sleep(delay).await;
        }
      }
    }

    Err(last_error.unwrap_or_else(|| TransportError::Network("max retries exceeded".into())))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[tokio::test]
  async fn succeeds_after_transient_failures() {
    let strategy = ExponentialBackoffRetry::new(1, 3);
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();

    let result: Result<&str, TransportError> = strategy
      .retry(|| {
        let c = c.clone();
        async move {
          if c.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(TransportError::Network("boom".into()))
          } else {
            Ok("ok")
          }
        }
      })
      .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(counter.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn non_retryable_stops_immediately() {
    let strategy = ExponentialBackoffRetry::new(1, 3);
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();

    let result: Result<&str, TransportError> = strategy
      .retry(|| {
        let c = c.clone();
        async move {
          c.fetch_add(1, Ordering::SeqCst);
          Err(TransportError::Serialize("bad payload".into()))
        }
      })
      .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn gives_up_after_max_retries() {
    let strategy = ExponentialBackoffRetry::new(1, 2);
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();

    let result: Result<&str, TransportError> = strategy
      .retry(|| {
        let c = c.clone();
        async move {
          c.fetch_add(1, Ordering::SeqCst);
          Err(TransportError::Network("always fails".into()))
        }
      })
      .await;

    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 3);
  }
}
