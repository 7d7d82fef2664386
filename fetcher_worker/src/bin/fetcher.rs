//! `fetcher`: consumes `ApplicationFetchQueue` and `RefreshStatusQueue`,
//! drives each delivery through [`FetchLoop`], and periodically reports its
//! own counters onto `FetcherMetricsQueue` (§4.3, §4.7). Grounded on
//! `notify_server::main`'s config-load -> broker-connect -> spawn-tasks ->
//! serve-health-router shape, repurposed for a dual-queue worker instead of
//! a single SSE broadcaster.

use anyhow::Result;
use fabric::{connect_with_retry, ConnectOptions, DedupCache, NatsBroker};
use fetcher_worker::browser::HttpBrowserEngine;
use fetcher_worker::fetch_loop::{FetchLoop, Outcome};
use fetcher_worker::metrics::MetricsCollector;
use fetcher_worker::{health, AppConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracker_core::contracts::{Broker, BrowserEngine, Consumer};
use tracker_core::ids::FetcherId;
use tracker_core::messages::FetcherMetricsMessage;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, Layer as _};

fn local_fetcher_id() -> FetcherId {
  let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
  FetcherId(format!("{host}-{}", std::process::id()))
}

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

  let context = connect_with_retry(&ConnectOptions {
    url: config.shared.broker.url.clone(),
    connect_backoff_ms: config.shared.broker.connect_backoff_ms,
    connect_max_retries: config.shared.broker.connect_max_retries,
  })
  .await?;
  let dedup = Arc::new(DedupCache::new(Duration::from_secs(config.shared.timing.dedup_ttl_secs)));
  let broker = Arc::new(NatsBroker::new(context, config.shared.queues.clone(), dedup));

  let browser = Arc::new(HttpBrowserEngine::new(Duration::from_secs(30)));
  let metrics = Arc::new(MetricsCollector::new(Duration::from_secs(config.shared.timing.dedup_ttl_secs)));
  let fetch_loop = Arc::new(FetchLoop::new(
    broker.clone(),
    browser.clone(),
    metrics.clone(),
    config.fetcher.portal_url_template.clone(),
    config.shared.timing.fetch_jitter_max_ms / 1000,
    config.shared.timing.max_job_retries,
    config.fetcher.max_messages,
    config.fetcher.rate_limit_window_secs,
    config.shared.timing.cool_off_secs,
  ));

  let fetcher_id = local_fetcher_id();
  let shutdown = CancellationToken::new();

  let fetch_task = {
    let broker = broker.clone();
    let fetch_loop = fetch_loop.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      let subscription = match broker.consume_fetch().await {
        Ok(subscription) => subscription,
        Err(error) => {
          error!(%error, "failed to subscribe to application fetch queue");
          return;
        }
      };
      run_consumer(subscription, fetch_loop, shutdown).await;
    })
  };

  let refresh_task = {
    let broker = broker.clone();
    let fetch_loop = fetch_loop.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      let subscription = match broker.consume_refresh().await {
        Ok(subscription) => subscription,
        Err(error) => {
          error!(%error, "failed to subscribe to refresh status queue");
          return;
        }
      };
      run_consumer(subscription, fetch_loop, shutdown).await;
    })
  };

  // §4.7: periodic self-reported snapshot onto `FetcherMetricsQueue`.
  let metrics_task = {
    let broker = broker.clone();
    let metrics = metrics.clone();
    let fetcher_id = fetcher_id.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      loop {
        tokio::select! {
          _ = shutdown.cancelled() => break,
          _ = tokio::time::sleep(Duration::from_secs(30)) => {
            let snapshot = metrics.snapshot();
            let message = FetcherMetricsMessage {
              fetcher_id: fetcher_id.clone(),
              success_count: snapshot.success_count as u64,
              failed_count: snapshot.failed_count as u64,
              retried_count: snapshot.retried_count as u64,
              avg_latency_ms: snapshot.avg_latency_ms,
              waiting: snapshot.waiting,
              locked: snapshot.locked,
              uptime_secs: snapshot.uptime_secs,
            };
            if let Err(error) = broker.publish_fetcher_metrics(message).await {
              error!(%error, "failed to publish fetcher metrics");
            }
          }
        }
      }
    })
  };

  // §4.3 Metrics: a periodic probe measures portal latency.
  let probe_task = {
    let browser = browser.clone();
    let metrics = metrics.clone();
    let portal_url = config.fetcher.portal_url_template.replace("{number}", "probe");
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      loop {
        tokio::select! {
          _ = shutdown.cancelled() => break,
          _ = tokio::time::sleep(Duration::from_secs(60)) => {
            match browser.probe_latency(&portal_url).await {
              Ok(latency) => metrics.record_latency(latency),
              Err(error) => error!(%error, "portal latency probe failed"),
            }
          }
        }
      }
    })
  };

  let addr = format!("0.0.0.0:{}", config.server.health_port);
  let listener = TcpListener::bind(&addr).await?;
  info!("fetcher ({fetcher_id}) listening on: {addr}");

  tokio::select! {
    result = axum::serve(listener, health::router(metrics.clone()).into_make_service()) => {
      result?;
    }
    _ = tokio::signal::ctrl_c() => {
      info!("shutdown signal received");
    }
  }

  shutdown.cancel();
  fetch_task.abort();
  refresh_task.abort();
  metrics_task.abort();
  probe_task.abort();
  browser.close().await.ok();

  Ok(())
}

async fn run_consumer(
  subscription: Box<dyn Consumer<tracker_core::messages::JobMessage>>,
  fetch_loop: Arc<FetchLoop<NatsBroker, HttpBrowserEngine>>,
  shutdown: CancellationToken,
) {
  loop {
    tokio::select! {
      _ = shutdown.cancelled() => break,
      delivery = subscription.next() => {
        match delivery {
          Ok(delivery) => {
            let delivery_count = delivery.delivery_count();
            let outcome = fetch_loop.process(delivery.payload().clone(), delivery_count).await;
            match outcome {
              Outcome::Handled | Outcome::Skipped => {
                let _ = delivery.ack().await;
              }
              Outcome::Retry => {
                let _ = delivery.nack(None).await;
              }
            }
          }
          Err(error) => {
            error!(%error, "fetch/refresh consumer error");
            break;
          }
        }
      }
    }
  }
}
