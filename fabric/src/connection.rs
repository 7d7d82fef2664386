//! Connects to the message fabric with retry, generalized from
//! `notify_server::events::nats::NatsClient::connect_with_retry` to also
//! provision the JetStream context and its durable streams (§4.1).

use async_nats::jetstream::{self, stream::Config as StreamConfig, Context};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ConnectOptions {
  pub url: String,
  pub connect_backoff_ms: u64,
  pub connect_max_retries: u32,
}

/// Connects to the broker with exponential-backoff retry and returns a
/// JetStream context with every durable queue declared.
pub async fn connect_with_retry(options: &ConnectOptions) -> anyhow::Result<Context> {
  let mut attempt = 0u32;

  loop {
    info!("connecting to message fabric: {}", options.url);

    let connect_options = async_nats::ConnectOptions::new()
      .connection_timeout(Duration::from_secs(10))
      .ping_interval(Duration::from_secs(30))
      .max_reconnects(Some(10))
      .reconnect_delay_callback(|attempts: usize| {
        Duration::from_secs(std::cmp::min(2u64.saturating_pow(attempts as u32), 30))
      });

    match connect_options.connect(&options.url).await {
      Ok(client) => {
        info!("connected to message fabric: {}", options.url);
        let context = jetstream::new(client);
        ensure_streams(&context).await?;
        return Ok(context);
      }
      Err(error) => {
        attempt += 1;
        if attempt >= options.connect_max_retries {
          error!("failed to connect to message fabric after {} attempts: {}", attempt, error);
          return Err(error.into());
        }
        let delay = Duration::from_millis(options.connect_backoff_ms.saturating_mul(attempt as u64));
        warn!(
          "failed to connect to message fabric (attempt {}/{}): {}. retrying in {:?}",
          attempt, options.connect_max_retries, error, delay
        );
        tokio::time::sleep(delay).await;
      }
    }
  }
}

const DURABLE_QUEUES: &[&str] = &[
  "ApplicationFetchQueue",
  "RefreshStatusQueue",
  "StatusUpdateQueue",
  "ExpirationQueue",
];

async fn ensure_streams(context: &Context) -> anyhow::Result<()> {
  for name in DURABLE_QUEUES {
    context
      .get_or_create_stream(StreamConfig {
        name: name.to_string(),
        subjects: vec![name.to_string()],
        retention: jetstream::stream::RetentionPolicy::WorkQueue,
        ..Default::default()
      })
      .await?;
  }
  Ok(())
}
