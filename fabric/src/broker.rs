//! [`NatsBroker`]: the `Broker` contract implemented over NATS JetStream,
//! generalizing `notify_server::events::nats::NatsClient`'s single
//! publish/subscribe pair into durable work-queue publish/consume for every
//! named queue in §6, plus the `FetcherMetricsQueue` broadcast.

use crate::dedup::DedupCache;
use crate::delivery::{CoreNatsConsumer, NatsConsumer};
use async_nats::jetstream::{consumer::pull::Config as PullConfig, Context};
use async_trait::async_trait;
use std::sync::Arc;
use tracker_core::contracts::{Broker, Consumer};
use tracker_core::error::TransportError;
use tracker_core::messages::{FetcherMetricsMessage, Fingerprint, JobMessage, StatusUpdateMessage};
use tracing::debug;

pub struct NatsBroker {
  context: Context,
  queues: tracker_core::config::QueueNames,
  dedup: Arc<DedupCache>,
}

impl NatsBroker {
  pub fn new(context: Context, queues: tracker_core::config::QueueNames, dedup: Arc<DedupCache>) -> Self {
    Self { context, queues, dedup }
  }

  async fn publish_json<T: serde::Serialize + Sync>(&self, subject: &str, message: &T) -> Result<(), TransportError> {
    let payload = serde_json::to_vec(message).map_err(|e| TransportError::Serialize(e.to_string()))?;
    self
      .context
      .publish(subject.to_string(), payload.into())
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;
    Ok(())
  }

  async fn publish_core_json<T: serde::Serialize + Sync>(&self, subject: &str, message: &T) -> Result<(), TransportError> {
    let payload = serde_json::to_vec(message).map_err(|e| TransportError::Serialize(e.to_string()))?;
    self
      .context
      .client()
      .publish(subject.to_string(), payload.into())
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;
    Ok(())
  }

  async fn pull_consumer<T: Send + Sync + 'static>(
    &self,
    stream_name: &str,
    decode: fn(&[u8]) -> Result<T, serde_json::Error>,
  ) -> Result<Box<dyn Consumer<T>>, TransportError> {
    let stream = self
      .context
      .get_stream(stream_name)
      .await
      .map_err(|e| TransportError::BrokerUnavailable(e.to_string()))?;

    let consumer = stream
      .get_or_create_consumer(
        "worker",
        PullConfig {
          durable_name: Some("worker".to_string()),
          ack_policy: async_nats::jetstream::consumer::AckPolicy::Explicit,
          ..Default::default()
        },
      )
      .await
      .map_err(|e| TransportError::BrokerUnavailable(e.to_string()))?;

    let messages = consumer
      .messages()
      .await
      .map_err(|e| TransportError::BrokerUnavailable(e.to_string()))?;

    Ok(Box::new(NatsConsumer {
      stream: tokio::sync::Mutex::new(messages),
      decode,
    }))
  }

  /// §4.1 Publish dedup: computes the fingerprint, claims it against the
  /// cache, and only calls through to `publish_json` on a fresh claim.
  /// Returns `Ok(())` without publishing on a collision (invariant #2,
  /// Scenario 6).
  async fn publish_job_deduped(&self, subject: &str, message: JobMessage) -> Result<(), TransportError> {
    let fingerprint = Fingerprint::from_job(&message);
    if !self.dedup.try_claim(fingerprint) {
      debug!(subject, fingerprint = %fingerprint.to_hex(), "duplicate publish suppressed by dedup cache");
      return Ok(());
    }
    self.publish_json(subject, &message).await
  }
}

fn decode_job(bytes: &[u8]) -> Result<JobMessage, serde_json::Error> {
  serde_json::from_slice(bytes)
}

fn decode_status_update(bytes: &[u8]) -> Result<StatusUpdateMessage, serde_json::Error> {
  serde_json::from_slice(bytes)
}

fn decode_fetcher_metrics(bytes: &[u8]) -> Result<FetcherMetricsMessage, serde_json::Error> {
  serde_json::from_slice(bytes)
}

#[async_trait]
impl Broker for NatsBroker {
  async fn publish_fetch(&self, message: JobMessage) -> Result<(), TransportError> {
    self.publish_job_deduped(&self.queues.application_fetch, message).await
  }

  async fn publish_refresh(&self, message: JobMessage) -> Result<(), TransportError> {
    self.publish_job_deduped(&self.queues.refresh_status, message).await
  }

  async fn publish_expiration(&self, message: JobMessage) -> Result<(), TransportError> {
    self.publish_job_deduped(&self.queues.expiration, message).await
  }

  async fn publish_status_update(&self, message: StatusUpdateMessage) -> Result<(), TransportError> {
    let fingerprint = Fingerprint::from_status_update(&message);
    if !self.dedup.try_claim(fingerprint) {
      debug!(
        subject = %self.queues.status_update,
        fingerprint = %fingerprint.to_hex(),
        "duplicate publish suppressed by dedup cache"
      );
      return Ok(());
    }
    self.publish_json(&self.queues.status_update, &message).await
  }

  async fn request_fetcher_metrics(&self) -> Result<(), TransportError> {
    self
      .context
      .client()
      .publish(format!("{}.request", self.queues.fetcher_metrics), "report".into())
      .await
      .map_err(|e| TransportError::Network(e.to_string()))?;
    Ok(())
  }

  async fn publish_fetcher_metrics(&self, message: FetcherMetricsMessage) -> Result<(), TransportError> {
    self.publish_core_json(&self.queues.fetcher_metrics, &message).await
  }

  async fn consume_fetch(&self) -> Result<Box<dyn Consumer<JobMessage>>, TransportError> {
    self.pull_consumer(&self.queues.application_fetch, decode_job).await
  }

  async fn consume_refresh(&self) -> Result<Box<dyn Consumer<JobMessage>>, TransportError> {
    self.pull_consumer(&self.queues.refresh_status, decode_job).await
  }

  async fn consume_expiration(&self) -> Result<Box<dyn Consumer<JobMessage>>, TransportError> {
    self.pull_consumer(&self.queues.expiration, decode_job).await
  }

  async fn consume_status_update(&self) -> Result<Box<dyn Consumer<StatusUpdateMessage>>, TransportError> {
    self.pull_consumer(&self.queues.status_update, decode_status_update).await
  }

  async fn consume_fetcher_metrics(&self) -> Result<Box<dyn Consumer<FetcherMetricsMessage>>, TransportError> {
    let subscriber = self
      .context
      .client()
      .subscribe(self.queues.fetcher_metrics.clone())
      .await
      .map_err(|e| TransportError::BrokerUnavailable(e.to_string()))?;
    Ok(Box::new(CoreNatsConsumer {
      subscriber: tokio::sync::Mutex::new(subscriber),
      decode: decode_fetcher_metrics,
    }))
  }
}
