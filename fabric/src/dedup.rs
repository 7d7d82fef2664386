//! Published-message dedup cache (§3, §4.1). A `DashMap`-guarded TTL set,
//! grounded on the `DashMap`-per-key pattern in
//! `notify_server::state::app_state::AppStateInner`, generalized from
//! connection/membership maps to a timestamped fingerprint set.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracker_core::Fingerprint;

pub struct DedupCache {
  entries: DashMap<Fingerprint, Instant>,
  ttl: Duration,
}

impl DedupCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries: DashMap::new(),
      ttl,
    }
  }

  /// Returns `true` and records the fingerprint if it hasn't been seen
  /// within the TTL window; returns `false` without recording otherwise.
  pub fn try_claim(&self, fingerprint: Fingerprint) -> bool {
    self.evict_expired();
    match self.entries.get(&fingerprint) {
      Some(seen_at) if seen_at.elapsed() < self.ttl => false,
      _ => {
        self.entries.insert(fingerprint, Instant::now());
        true
      }
    }
  }

  /// Lets the next cycle publish immediately, called when a reply is
  /// observed on `StatusUpdateQueue` (§4.1 Dedup semantics).
  pub fn discard(&self, fingerprint: Fingerprint) {
    self.entries.remove(&fingerprint);
  }

  fn evict_expired(&self) {
    self.entries.retain(|_, seen_at| seen_at.elapsed() < self.ttl);
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracker_core::ids::UserId;
  use tracker_core::messages::RequestType;
  use tracker_core::ApplicationKey;

  fn fp(last_updated: &str) -> Fingerprint {
    let key = ApplicationKey {
      number: "12345".into(),
      suffix: None,
      application_type: "TP".into(),
      year: 2023,
    };
    Fingerprint::new(RequestType::Refresh, UserId(1), &key, last_updated)
  }

  #[test]
  fn first_claim_succeeds_second_is_suppressed() {
    let cache = DedupCache::new(Duration::from_secs(60));
    assert!(cache.try_claim(fp("0")));
    assert!(!cache.try_claim(fp("0")));
  }

  #[test]
  fn discard_allows_reclaim() {
    let cache = DedupCache::new(Duration::from_secs(60));
    let f = fp("0");
    assert!(cache.try_claim(f));
    cache.discard(f);
    assert!(cache.try_claim(f));
  }

  #[test]
  fn expired_entry_can_be_reclaimed() {
    let cache = DedupCache::new(Duration::from_millis(1));
    let f = fp("0");
    assert!(cache.try_claim(f));
    std::thread::sleep(Duration::from_millis(10));
    assert!(cache.try_claim(f));
  }
}
