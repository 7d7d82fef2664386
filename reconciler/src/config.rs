use serde::{Deserialize, Serialize};
use tracker_core::config::{self, SharedConfig};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
  pub shared: SharedConfig,
  pub server: ServerConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
  pub port: u16,
}

impl AppConfig {
  /// Reads `./reconciler.yml`, then `/etc/config/reconciler.yml`, then the
  /// path in `$RECONCILER_CONFIG`.
  pub fn load() -> anyhow::Result<Self> {
    config::load_yaml("reconciler", "RECONCILER_CONFIG")
  }
}
