use serde::{Deserialize, Serialize};
use tracker_core::config::{self, SharedConfig};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
  pub shared: SharedConfig,
  pub server: ServerConfig,
  pub fetcher: FetcherConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
  pub health_port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FetcherConfig {
  pub portal_url_template: String,
  #[serde(default = "default_max_messages")]
  pub max_messages: u32,
  #[serde(default = "default_rate_limit_window_secs")]
  pub rate_limit_window_secs: u64,
}

fn default_max_messages() -> u32 {
  100
}

fn default_rate_limit_window_secs() -> u64 {
  60
}

impl AppConfig {
  /// Reads `./fetcher.yml`, then `/etc/config/fetcher.yml`, then the path
  /// in `$FETCHER_CONFIG`.
  pub fn load() -> anyhow::Result<Self> {
    config::load_yaml("fetcher", "FETCHER_CONFIG")
  }
}
