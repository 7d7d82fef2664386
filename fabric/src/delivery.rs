//! [`Delivery`]/[`Consumer`] adapters over JetStream pull consumers.

use async_nats::jetstream::{
  consumer::pull::Stream as PullStream,
  AckKind,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracker_core::contracts::{Consumer, Delivery};
use tracker_core::error::TransportError;

pub struct NatsDelivery<T> {
  message: async_nats::jetstream::Message,
  payload: T,
}

#[async_trait]
impl<T: Send + Sync> Delivery<T> for NatsDelivery<T> {
  fn payload(&self) -> &T {
    &self.payload
  }

  fn delivery_count(&self) -> u64 {
    self.message.info().map(|info| info.delivered as u64).unwrap_or(1).saturating_sub(1)
  }

  async fn ack(&self) -> Result<(), TransportError> {
    self
      .message
      .ack()
      .await
      .map_err(|e| TransportError::Network(e.to_string()))
  }

  async fn nack(&self, delay: Option<Duration>) -> Result<(), TransportError> {
    let kind = match delay {
      Some(delay) => AckKind::Nak(Some(delay)),
      None => AckKind::Nak(None),
    };
    self
      .message
      .ack_with(kind)
      .await
      .map_err(|e| TransportError::Network(e.to_string()))
  }
}

pub struct NatsConsumer<T> {
  pub(crate) stream: tokio::sync::Mutex<PullStream>,
  pub(crate) decode: fn(&[u8]) -> Result<T, serde_json::Error>,
}

#[async_trait]
impl<T: Send + Sync + 'static> Consumer<T> for NatsConsumer<T> {
  async fn next(&self) -> Result<Box<dyn Delivery<T>>, TransportError> {
    let mut stream = self.stream.lock().await;
    let message = stream
      .next()
      .await
      .ok_or_else(|| TransportError::BrokerUnavailable("consumer stream closed".into()))?
      .map_err(|e| TransportError::Network(e.to_string()))?;

    let payload = (self.decode)(&message.payload).map_err(|e| TransportError::Serialize(e.to_string()))?;
    Ok(Box::new(NatsDelivery { message, payload }))
  }
}

/// A [`Delivery`] for the non-durable `FetcherMetricsQueue`: core NATS
/// pub/sub has no redelivery to suppress, so `ack`/`nack` are no-ops.
pub struct CoreDelivery<T> {
  payload: T,
}

#[async_trait]
impl<T: Send + Sync> Delivery<T> for CoreDelivery<T> {
  fn payload(&self) -> &T {
    &self.payload
  }

  fn delivery_count(&self) -> u64 {
    0
  }

  async fn ack(&self) -> Result<(), TransportError> {
    Ok(())
  }

  async fn nack(&self, _delay: Option<Duration>) -> Result<(), TransportError> {
    Ok(())
  }
}

pub struct CoreNatsConsumer<T> {
  pub(crate) subscriber: tokio::sync::Mutex<async_nats::Subscriber>,
  pub(crate) decode: fn(&[u8]) -> Result<T, serde_json::Error>,
}

#[async_trait]
impl<T: Send + Sync + 'static> Consumer<T> for CoreNatsConsumer<T> {
  async fn next(&self) -> Result<Box<dyn Delivery<T>>, TransportError> {
    let mut subscriber = self.subscriber.lock().await;
    let message = subscriber
      .next()
      .await
      .ok_or_else(|| TransportError::BrokerUnavailable("subscription closed".into()))?;
    let payload = (self.decode)(&message.payload).map_err(|e| TransportError::Serialize(e.to_string()))?;
    Ok(Box::new(CoreDelivery { payload }))
  }
}
