//! `metrics_hub`: consumes `FetcherMetricsQueue` into a TTL-keyed
//! [`MetricsStore`] and serves it over `GET /metrics/fetchers[/:id]` (§4.7).
//! Grounded on `notify_server::main`'s config-load -> connect ->
//! spawn-background-task -> serve-health-router shape.

use anyhow::Result;
use axum::Router;
use fabric::{connect_with_retry, ConnectOptions, DedupCache, NatsBroker};
use metrics_hub::{health, routes, AppConfig, MetricsStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracker_core::contracts::{Broker, Consumer};
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
      eprintln!("quick fix: copy metrics_hub.yml.example to metrics_hub.yml, or set METRICS_HUB_CONFIG");
      std::process::exit(1);
    }
  };

  let context = connect_with_retry(&ConnectOptions {
    url: config.broker.url.clone(),
    connect_backoff_ms: config.broker.connect_backoff_ms,
    connect_max_retries: config.broker.connect_max_retries,
  })
  .await?;
  // metrics_hub never calls a deduped publish path (it only broadcasts the
  // plaintext "report now" request and consumes `FetcherMetricsQueue`), so
  // this cache sits unused; `NatsBroker` still requires one.
  let dedup = Arc::new(DedupCache::new(Duration::from_secs(300)));
  let broker = Arc::new(NatsBroker::new(context, config.queues.clone(), dedup));
  let store = Arc::new(MetricsStore::new(Duration::from_secs(config.server.cache_ttl_secs)));

  let shutdown = CancellationToken::new();

  let consume_task = {
    let broker = broker.clone();
    let store = store.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      let subscription = match broker.consume_fetcher_metrics().await {
        Ok(subscription) => subscription,
        Err(error) => {
          error!(%error, "failed to subscribe to fetcher metrics queue");
          return;
        }
      };
      loop {
        tokio::select! {
          _ = shutdown.cancelled() => break,
          delivery = subscription.next() => {
            match delivery {
              Ok(delivery) => {
                store.update(delivery.payload().clone());
                let _ = delivery.ack().await;
              }
              Err(error) => {
                error!(%error, "fetcher metrics consumer error");
                break;
              }
            }
          }
        }
      }
    })
  };

  // A standing broadcast asking every fetcher to report immediately, so a
  // freshly (re)started hub doesn't wait out the fetchers' own 30s cadence.
  if let Err(error) = broker.request_fetcher_metrics().await {
    error!(%error, "failed to broadcast initial fetcher metrics request");
  }

  let app = Router::new().merge(health::router(store.clone())).merge(routes::router(store.clone()));
  let addr = format!("0.0.0.0:{}", config.server.port);
  let listener = TcpListener::bind(&addr).await?;
  info!("metrics_hub listening on: {addr}");

  tokio::select! {
    result = axum::serve(listener, app.into_make_service()) => {
      result?;
    }
    _ = tokio::signal::ctrl_c() => {
      info!("shutdown signal received");
    }
  }

  shutdown.cancel();
  consume_task.abort();

  Ok(())
}
