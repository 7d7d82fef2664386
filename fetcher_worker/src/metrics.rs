//! Sliding-window fetch counters, a bounded latency sample deque, and
//! waiting/locked request-state counters (§4.3 Metrics), ported from
//! `fetcher/metrics_collector.py::MetricsCollector`.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MAX_LATENCY_SAMPLES: usize = 5;

#[derive(Debug, Default, Serialize, Clone)]
pub struct MetricsSnapshot {
  pub success_count: usize,
  pub failed_count: usize,
  pub retried_count: usize,
  pub avg_latency_ms: f64,
  pub waiting: i64,
  pub locked: i64,
  pub uptime_secs: u64,
}

struct Inner {
  success: VecDeque<Instant>,
  failed: VecDeque<Instant>,
  retried: VecDeque<Instant>,
  latencies: VecDeque<Duration>,
  waiting: i64,
  locked: i64,
}

pub struct MetricsCollector {
  inner: Mutex<Inner>,
  ttl: Duration,
  started_at: Instant,
}

impl MetricsCollector {
  pub fn new(ttl: Duration) -> Self {
    Self {
      inner: Mutex::new(Inner {
        success: VecDeque::new(),
        failed: VecDeque::new(),
        retried: VecDeque::new(),
        latencies: VecDeque::new(),
        waiting: 0,
        locked: 0,
      }),
      ttl,
      started_at: Instant::now(),
    }
  }

  pub fn record_success(&self) {
    self.inner.lock().unwrap().success.push_back(Instant::now());
  }

  pub fn record_failed(&self) {
    self.inner.lock().unwrap().failed.push_back(Instant::now());
  }

  pub fn record_retried(&self) {
    self.inner.lock().unwrap().retried.push_back(Instant::now());
  }

  pub fn record_latency(&self, latency: Duration) {
    let mut inner = self.inner.lock().unwrap();
    inner.latencies.push_back(latency);
    while inner.latencies.len() > MAX_LATENCY_SAMPLES {
      inner.latencies.pop_front();
    }
  }

  pub fn incr_waiting(&self) {
    self.inner.lock().unwrap().waiting += 1;
  }

  pub fn decr_waiting(&self) {
    self.inner.lock().unwrap().waiting -= 1;
  }

  pub fn incr_locked(&self) {
    self.inner.lock().unwrap().locked += 1;
  }

  pub fn decr_locked(&self) {
    self.inner.lock().unwrap().locked -= 1;
  }

  pub fn snapshot(&self) -> MetricsSnapshot {
    let mut inner = self.inner.lock().unwrap();
    let cutoff = Instant::now() - self.ttl;
    inner.success.retain(|t| *t >= cutoff);
    inner.failed.retain(|t| *t >= cutoff);
    inner.retried.retain(|t| *t >= cutoff);

    let avg_latency_ms = if inner.latencies.is_empty() {
      0.0
    } else {
      inner.latencies.iter().map(|d| d.as_secs_f64() * 1000.0).sum::<f64>() / inner.latencies.len() as f64
    };

    MetricsSnapshot {
      success_count: inner.success.len(),
      failed_count: inner.failed.len(),
      retried_count: inner.retried.len(),
      avg_latency_ms,
      waiting: inner.waiting,
      locked: inner.locked,
      uptime_secs: self.started_at.elapsed().as_secs(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn latency_samples_are_bounded() {
    let collector = MetricsCollector::new(Duration::from_secs(300));
    for i in 0..10 {
      collector.record_latency(Duration::from_millis(i));
    }
    let snapshot = collector.snapshot();
    assert!(snapshot.avg_latency_ms >= 0.0);
  }

  #[test]
  fn waiting_counter_tracks_increments_and_decrements() {
    let collector = MetricsCollector::new(Duration::from_secs(300));
    collector.incr_waiting();
    collector.incr_waiting();
    collector.decr_waiting();
    assert_eq!(collector.snapshot().waiting, 1);
  }
}
