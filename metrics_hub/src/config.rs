//! Configuration for the Metrics Hub, following the three-source load order
//! every other service uses (`tracker_core::config::load_yaml`).

use serde::{Deserialize, Serialize};
use tracker_core::config::{self, BrokerConfig, QueueNames};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
  pub broker: BrokerConfig,
  #[serde(default)]
  pub queues: QueueNames,
  pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
  pub port: u16,
  /// Matches §4.7's cache TTL (~300s) for evicting stale fetcher entries.
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
  300
}

impl AppConfig {
  /// Reads `./metrics_hub.yml`, then `/etc/config/metrics_hub.yml`, then the
  /// path in `$METRICS_HUB_CONFIG`.
  pub fn load() -> anyhow::Result<Self> {
    config::load_yaml("metrics_hub", "METRICS_HUB_CONFIG")
  }
}
