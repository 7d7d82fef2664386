use anyhow::Result;
use fabric::{connect_with_retry, ConnectOptions, DedupCache, NatsBroker};
use reconciler::expiration_consumer::ExpirationConsumer;
use reconciler::notifier::Notifier;
use reconciler::status_consumer::StatusConsumer;
use reconciler::telegram::TelegramChatSink;
use reconciler::{health, AppConfig, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracker_core::contracts::Broker;
use tracker_core::retry::ExponentialBackoffRetry;
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
      eprintln!("quick fix: copy reconciler.yml.example to reconciler.yml, or set RECONCILER_CONFIG");
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
  let broker = Arc::new(NatsBroker::new(context, config.shared.queues.clone(), dedup.clone()));

  let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")?;
  let chat_sink = Arc::new(TelegramChatSink::new(&bot_token));
  let notifier = Arc::new(Notifier::new(chat_sink.clone(), ExponentialBackoffRetry::default()));

  let status_consumer = Arc::new(StatusConsumer::new(store.clone(), dedup.clone(), notifier.clone()));
  let expiration_consumer = Arc::new(ExpirationConsumer::new(store.clone(), notifier.clone()));

  let shutdown = CancellationToken::new();

  let status_task = {
    let broker = broker.clone();
    let consumer = status_consumer.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      let subscription = match broker.consume_status_update().await {
        Ok(subscription) => subscription,
        Err(error) => {
          error!(%error, "failed to subscribe to status update queue");
          return;
        }
      };
      loop {
        tokio::select! {
          _ = shutdown.cancelled() => break,
          delivery = subscription.next() => {
            match delivery {
              Ok(delivery) => {
                if consumer.handle(delivery.payload()).await {
                  let _ = delivery.ack().await;
                } else {
                  let _ = delivery.nack(None).await;
                }
              }
              Err(error) => {
                error!(%error, "status update consumer error");
                break;
              }
            }
          }
        }
      }
    })
  };

  let expiration_task = {
    let broker = broker.clone();
    let consumer = expiration_consumer.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
      let subscription = match broker.consume_expiration().await {
        Ok(subscription) => subscription,
        Err(error) => {
          error!(%error, "failed to subscribe to expiration queue");
          return;
        }
      };
      loop {
        tokio::select! {
          _ = shutdown.cancelled() => break,
          delivery = subscription.next() => {
            match delivery {
              Ok(delivery) => {
                if consumer.handle(delivery.payload()).await {
                  let _ = delivery.ack().await;
                } else {
                  let _ = delivery.nack(None).await;
                }
              }
              Err(error) => {
                error!(%error, "expiration consumer error");
                break;
              }
            }
          }
        }
      }
    })
  };

  let state = AppState::new(store, broker, dedup, chat_sink);
  let addr = format!("0.0.0.0:{}", config.server.port);
  let listener = TcpListener::bind(&addr).await?;
  info!("reconciler listening on: {addr}");

  tokio::select! {
    result = axum::serve(listener, health::router(state).into_make_service()) => {
      result?;
    }
    _ = tokio::signal::ctrl_c() => {
      info!("shutdown signal received");
    }
  }

  shutdown.cancel();
  status_task.abort();
  expiration_task.abort();

  Ok(())
}
