//! [`MetricsStore`]: a TTL cache keyed by fetcher id (§4.7), holding the
//! last [`FetcherMetricsMessage`] each fetcher worker reported. Grounded on
//! the `DashMap`-guarded-by-construction state pattern in
//! `notify_server::state::app_state::AppStateInner`, applied here to a
//! `(Instant, _)` pair instead of connection sets so staleness is explicit.

use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracker_core::ids::FetcherId;
use tracker_core::messages::FetcherMetricsMessage;

#[derive(Debug, Clone, Serialize)]
pub struct FetcherMetricsView {
  pub fetcher_id: FetcherId,
  pub success_count: u64,
  pub failed_count: u64,
  pub retried_count: u64,
  pub avg_latency_ms: f64,
  pub waiting: i64,
  pub locked: i64,
  pub uptime_secs: u64,
  pub age_secs: u64,
}

fn to_view(message: &FetcherMetricsMessage, recorded_at: Instant) -> FetcherMetricsView {
  FetcherMetricsView {
    fetcher_id: message.fetcher_id.clone(),
    success_count: message.success_count,
    failed_count: message.failed_count,
    retried_count: message.retried_count,
    avg_latency_ms: message.avg_latency_ms,
    waiting: message.waiting,
    locked: message.locked,
    uptime_secs: message.uptime_secs,
    age_secs: recorded_at.elapsed().as_secs(),
  }
}

pub struct MetricsStore {
  entries: DashMap<FetcherId, (Instant, FetcherMetricsMessage)>,
  ttl: Duration,
}

impl MetricsStore {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries: DashMap::new(),
      ttl,
    }
  }

  pub fn update(&self, message: FetcherMetricsMessage) {
    self.entries.insert(message.fetcher_id.clone(), (Instant::now(), message));
  }

  fn evict_expired(&self) {
    let ttl = self.ttl;
    self.entries.retain(|_, (recorded_at, _)| recorded_at.elapsed() < ttl);
  }

  pub fn get(&self, fetcher_id: &FetcherId) -> Option<FetcherMetricsView> {
    self.evict_expired();
    self
      .entries
      .get(fetcher_id)
      .map(|entry| to_view(&entry.value().1, entry.value().0))
  }

  pub fn get_all(&self) -> Vec<FetcherMetricsView> {
    self.evict_expired();
    self.entries.iter().map(|entry| to_view(&entry.value().1, entry.value().0)).collect()
  }

  pub fn len(&self) -> usize {
    self.evict_expired();
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(id: &str) -> FetcherMetricsMessage {
    FetcherMetricsMessage {
      fetcher_id: FetcherId(id.to_string()),
      success_count: 10,
      failed_count: 1,
      retried_count: 2,
      avg_latency_ms: 123.0,
      waiting: 0,
      locked: 1,
      uptime_secs: 60,
    }
  }

  #[test]
  fn update_then_get_round_trips() {
    let store = MetricsStore::new(Duration::from_secs(300));
    store.update(sample("fetcher-a"));
    let view = store.get(&FetcherId("fetcher-a".into())).unwrap();
    assert_eq!(view.success_count, 10);
  }

  #[test]
  fn get_all_reflects_every_fetcher() {
    let store = MetricsStore::new(Duration::from_secs(300));
    store.update(sample("fetcher-a"));
    store.update(sample("fetcher-b"));
    assert_eq!(store.get_all().len(), 2);
  }

  #[test]
  fn expired_entry_is_evicted() {
    let store = MetricsStore::new(Duration::from_millis(1));
    store.update(sample("fetcher-a"));
    std::thread::sleep(Duration::from_millis(20));
    assert!(store.get(&FetcherId("fetcher-a".into())).is_none());
  }
}
