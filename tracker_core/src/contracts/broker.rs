//! Message fabric contract (§4.1). Generalizes the teacher's
//! `notify_server::events::nats::NatsClient` publish/subscribe pair into a
//! durable-queue abstraction with ack/nack, since the spec requires
//! RabbitMQ-style redelivery semantics that plain NATS core pub/sub lacks.

use crate::error::TransportError;
use crate::messages::{FetcherMetricsMessage, JobMessage, StatusUpdateMessage};
use async_trait::async_trait;
use std::time::Duration;

/// A message handed back by [`Consumer::next`], carrying enough context to
/// ack, nack, or inspect the redelivery count (§4.3 step 6, bounded retry).
#[async_trait]
pub trait Delivery<T>: Send {
  fn payload(&self) -> &T;

  /// Number of times this message has previously been delivered. Zero on
  /// first delivery.
  fn delivery_count(&self) -> u64;

  /// Acknowledge successful processing; the broker will not redeliver.
  async fn ack(&self) -> Result<(), TransportError>;

  /// Negative-acknowledge, optionally asking the broker to hold off
  /// redelivery for `delay` (§4.3 step 6 cool-off, §4.6 Retry-After).
  async fn nack(&self, delay: Option<Duration>) -> Result<(), TransportError>;
}

/// A durable subscription positioned on one named queue.
#[async_trait]
pub trait Consumer<T>: Send + Sync {
  async fn next(&self) -> Result<Box<dyn Delivery<T>>, TransportError>;
}

/// The message fabric: durable job queues plus a non-durable metrics
/// broadcast and a dedup-aware publish path (§3 Published-Message Cache).
#[async_trait]
pub trait Broker: Send + Sync {
  async fn publish_fetch(&self, message: JobMessage) -> Result<(), TransportError>;
  async fn publish_refresh(&self, message: JobMessage) -> Result<(), TransportError>;
  async fn publish_expiration(&self, message: JobMessage) -> Result<(), TransportError>;
  async fn publish_status_update(&self, message: StatusUpdateMessage) -> Result<(), TransportError>;

  /// Broadcasts a request for every fetcher worker to report its queue
  /// depth onto `FetcherMetricsQueue` (§4.7, `FetchAllChatIds`-style
  /// fan-out, supplemented feature).
  async fn request_fetcher_metrics(&self) -> Result<(), TransportError>;

  /// A fetcher's reply to a metrics request, published on the same
  /// non-durable `FetcherMetricsQueue` subject.
  async fn publish_fetcher_metrics(&self, message: FetcherMetricsMessage) -> Result<(), TransportError>;

  async fn consume_fetch(&self) -> Result<Box<dyn Consumer<JobMessage>>, TransportError>;
  async fn consume_refresh(&self) -> Result<Box<dyn Consumer<JobMessage>>, TransportError>;
  async fn consume_expiration(&self) -> Result<Box<dyn Consumer<JobMessage>>, TransportError>;
  async fn consume_status_update(&self) -> Result<Box<dyn Consumer<StatusUpdateMessage>>, TransportError>;

  /// Non-durable subscription to `FetcherMetricsQueue`, consumed by the
  /// Metrics Hub (§4.7). Deliveries auto-acknowledge since core NATS
  /// pub/sub has no redelivery to suppress.
  async fn consume_fetcher_metrics(&self) -> Result<Box<dyn Consumer<FetcherMetricsMessage>>, TransportError>;
}
