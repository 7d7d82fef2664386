//! Delivers notification text to a chat user, retrying transient failures
//! through `tracker_core::retry::ExponentialBackoffRetry` (§4.6).

use std::sync::Arc;
use tracker_core::contracts::ChatSink;
use tracker_core::error::TransportError;
use tracker_core::ids::UserId;
use tracker_core::retry::ExponentialBackoffRetry;

pub struct Notifier {
  sink: Arc<dyn ChatSink>,
  retry: ExponentialBackoffRetry,
}

impl Notifier {
  pub fn new(sink: Arc<dyn ChatSink>, retry: ExponentialBackoffRetry) -> Self {
    Self { sink, retry }
  }

  pub async fn notify(&self, chat_id: UserId, text: &str) -> Result<(), TransportError> {
    self.retry.retry(|| async { self.sink.send(chat_id, text).await }).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct FlakySink {
    failures_left: AtomicU32,
  }

  #[async_trait]
  impl ChatSink for FlakySink {
    async fn send(&self, _chat_id: UserId, _text: &str) -> Result<(), TransportError> {
      if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
        Err(TransportError::Network("temporarily unreachable".into()))
      } else {
        Ok(())
      }
    }
  }

  #[tokio::test]
  async fn retries_until_delivery_succeeds() {
    let sink = Arc::new(FlakySink {
      failures_left: AtomicU32::new(2),
    });
    let notifier = Notifier::new(sink, ExponentialBackoffRetry::new(1, 5));
    let result = notifier.notify(UserId(1), "hello").await;
    assert!(result.is_ok());
  }

  struct AlwaysUnauthorized;

  #[async_trait]
  impl ChatSink for AlwaysUnauthorized {
    async fn send(&self, _chat_id: UserId, _text: &str) -> Result<(), TransportError> {
      Err(TransportError::Authentication("bot was blocked by user".into()))
    }
  }

  #[tokio::test]
  async fn terminal_error_is_not_retried() {
    let notifier = Notifier::new(Arc::new(AlwaysUnauthorized), ExponentialBackoffRetry::new(1, 5));
    let result = notifier.notify(UserId(1), "hello").await;
    assert!(matches!(result, Err(TransportError::Authentication(_))));
  }
}
