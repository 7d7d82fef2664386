//! Per-request fetch lifecycle and the fetch/refresh mutual-exclusion sets
//! (§4.3). Grounded on the per-key `DashMap` guard pattern in
//! `notify_server::state::app_state::AppStateInner`, applied here to a pair
//! of `DashSet<ApplicationKey>` rather than connection maps.

use crate::metrics::MetricsCollector;
use crate::rate_limiter::RateLimiter;
use dashmap::DashSet;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracker_core::contracts::{Broker, BrowserEngine};
use tracker_core::domain::ApplicationKey;
use tracker_core::messages::{JobMessage, RequestType, StatusUpdateMessage};
use tracing::{info, warn};

pub struct FetchLoop<B: Broker, E: BrowserEngine> {
  broker: Arc<B>,
  browser: Arc<E>,
  metrics: Arc<MetricsCollector>,
  rate_limiter: RateLimiter,
  fetch_in_progress: DashSet<ApplicationKey>,
  refresh_in_progress: DashSet<ApplicationKey>,
  portal_url_template: String,
  jitter_max_secs: u64,
  max_retries: u32,
}

/// Outcome of [`FetchLoop::process`], telling the caller whether to ack.
pub enum Outcome {
  /// Message handled to completion (published a reply, or retries are
  /// exhausted and a `failed=true` status update went out); ack the
  /// original delivery.
  Handled,
  /// Same key already in progress; ack without processing (§4.3).
  Skipped,
  /// Fetch failed and retries remain; NAK the original delivery so
  /// JetStream redelivers it with an incremented `NumDelivered`, instead of
  /// requeueing a fresh message that would reset the retry count to zero.
  Retry,
}

impl<B: Broker, E: BrowserEngine> FetchLoop<B, E> {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    broker: Arc<B>,
    browser: Arc<E>,
    metrics: Arc<MetricsCollector>,
    portal_url_template: String,
    jitter_max_secs: u64,
    max_retries: u32,
    max_messages: u32,
    rate_limit_window_secs: u64,
    cool_off_secs: u64,
  ) -> Self {
    Self {
      broker,
      browser,
      metrics,
      rate_limiter: RateLimiter::new(
        max_messages,
        Duration::from_secs(rate_limit_window_secs),
        Duration::from_secs(cool_off_secs),
      ),
      fetch_in_progress: DashSet::new(),
      refresh_in_progress: DashSet::new(),
      portal_url_template,
      jitter_max_secs,
      max_retries,
    }
  }

  /// Processes one delivery from either `ApplicationFetchQueue` or
  /// `RefreshStatusQueue` (§4.3 steps 1-7).
  pub async fn process(&self, message: JobMessage, delivery_count: u64) -> Outcome {
    // §4.3 rate-limit escape hatch: count this delivery first, cooling off
    // before any further work if it pushed the window past its limit.
    self.rate_limiter.throttle().await;

    let key = message.key();
    let is_retry = delivery_count > 0;

    // step 1 is the caller's header/key parse; key() already done.
    match message.request_type {
      RequestType::Fetch => {
        if !is_retry && !self.fetch_in_progress.insert(key.clone()) {
          return Outcome::Skipped;
        }
      }
      RequestType::Refresh => {
        if !is_retry
          && (self.fetch_in_progress.contains(&key) || !self.refresh_in_progress.insert(key.clone()))
        {
          return Outcome::Skipped;
        }
      }
      RequestType::Expire => unreachable!("expire messages are not routed through FetchLoop"),
    }

    self.metrics.incr_locked();

    // step 2: jitter sleep for refreshes without a retry header.
    if matches!(message.request_type, RequestType::Refresh) && !is_retry {
      let jitter = rand::thread_rng().gen_range(5..self.jitter_max_secs.max(6));
      self.metrics.incr_waiting();
      tokio::time::sleep(Duration::from_secs(jitter)).await;
      self.metrics.decr_waiting();
    }

    let url = self.portal_url_template.replace("{number}", &key.number);

    // step 3: invoke the browser-engine collaborator.
    let fetch_result = self.browser.fetch(&url, &key).await;

    let outcome = match fetch_result {
      // step 4: number-consistency guard.
      Ok(status) if status.contains(&key.number) => {
        self.metrics.record_success();
        let mut reply: StatusUpdateMessage = message.clone().into();
        reply.status = Some(status);
        if let Err(error) = self.broker.publish_status_update(reply).await {
          warn!(%error, key = %key, "failed to publish status update");
        }
        Outcome::Handled
      }
      Ok(_non_matching) => self.manage_failed_request(message, delivery_count).await,
      Err(error) => {
        warn!(%error, key = %key, "fetch failed");
        self.manage_failed_request(message, delivery_count).await
      }
    };

    self.metrics.decr_locked();

    // step 7: release the processing lock for the key. A retry is about to
    // be NAK'd back onto the queue as a new delivery, not held open here, so
    // it releases the lock the same as a completed delivery.
    match outcome {
      Outcome::Handled | Outcome::Retry if !is_retry => {
        self.fetch_in_progress.remove(&key);
        self.refresh_in_progress.remove(&key);
      }
      _ => {}
    }

    outcome
  }

  /// §4.3 step 6: bounded retry against JetStream's own redelivery count,
  /// escalating to a `failed=true` status update once it's exhausted.
  async fn manage_failed_request(&self, message: JobMessage, delivery_count: u64) -> Outcome {
    if delivery_count < self.max_retries as u64 {
      self.metrics.record_retried();
      info!(
        key = %message.key(),
        attempt = delivery_count + 1,
        max = self.max_retries,
        "failed fetch will be redelivered for retry"
      );
      Outcome::Retry
    } else {
      self.metrics.record_failed();
      let mut reply: StatusUpdateMessage = message.into();
      reply.failed = true;
      reply.status = Some(format!("ERROR: failed after {} attempts", self.max_retries));
      if let Err(error) = self.broker.publish_status_update(reply).await {
        warn!(%error, "failed to publish exhausted-retry status update");
      }
      Outcome::Handled
    }
  }
}
