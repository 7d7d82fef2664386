//! `scheduler`: owns `{Store, Fabric}` and drives the two monitor loops from
//! [`fetcher_worker::scheduler`] against one shared cancellation token (§4.4,
//! §5). Grounded on `notify_server::main`'s config-load -> connect ->
//! spawn-background-tasks shape; this binary has no HTTP surface of its own
//! in the original `bot_server::indexer` (a one-shot CLI), generalized here
//! into a long-running pair of tasks instead.

use anyhow::Result;
use chrono::Duration as ChronoDuration;
use chrono_tz::Tz;
use fabric::{connect_with_retry, ConnectOptions, DedupCache, NatsBroker};
use fetcher_worker::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracker_core::PgStore;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, Layer as _};

#[tokio::main]
async fn main() -> Result<()> {
  let layer = Layer::new().with_filter(LevelFilter::INFO);
  tracing_subscriber::registry().with(layer).init();

  let config = match AppConfig::load() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("failed to load configuration: {e}");
      eprintln!("quick fix: copy fetcher.yml.example to fetcher.yml, or set FETCHER_CONFIG");
      std::process::exit(1);
    }
  };

  let store = Arc::new(PgStore::connect(&config.shared.db_url).await?);
  let context = connect_with_retry(&ConnectOptions {
    url: config.shared.broker.url.clone(),
    connect_backoff_ms: config.shared.broker.connect_backoff_ms,
    connect_max_retries: config.shared.broker.connect_max_retries,
  })
  .await?;
  let dedup = Arc::new(DedupCache::new(Duration::from_secs(config.shared.timing.dedup_ttl_secs)));
  let broker = Arc::new(NatsBroker::new(context, config.shared.queues.clone(), dedup));

  let timezone: Tz = config
    .shared
    .timing
    .timezone
    .parse()
    .unwrap_or(chrono_tz::Europe::Prague);

  let shutdown = CancellationToken::new();

  let application_task = {
    let store = store.clone();
    let broker = broker.clone();
    let shutdown = shutdown.clone();
    let period = Duration::from_secs(config.shared.timing.scheduler_period_secs);
    let refresh = ChronoDuration::seconds(config.shared.timing.refresh_period_secs as i64);
    let not_found_refresh = ChronoDuration::seconds(config.shared.timing.not_found_refresh_period_secs as i64);
    let max_age = ChronoDuration::days(config.shared.timing.not_found_max_days);
    tokio::spawn(async move {
      fetcher_worker::scheduler::application_monitor(store, broker, period, refresh, not_found_refresh, max_age, shutdown).await;
    })
  };

  let reminder_task = {
    let store = store.clone();
    let broker = broker.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      fetcher_worker::scheduler::reminder_monitor(store, broker, timezone, shutdown).await;
    })
  };

  info!("scheduler running (scheduler_period={}s)", config.shared.timing.scheduler_period_secs);

  tokio::signal::ctrl_c().await?;
  info!("shutdown signal received");

  shutdown.cancel();
  if let Err(error) = application_task.await {
    error!(%error, "application monitor task panicked");
  }
  if let Err(error) = reminder_task.await {
    error!(%error, "reminder monitor task panicked");
  }

  Ok(())
}
