//! Shared timing and queue-naming configuration (§6), loaded the way the
//! teacher's `notify_server::config::AppConfig` does: try a local file, then
//! `/etc/config/<name>.yml`, then a path given by an environment variable.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
  pub url: String,
  #[serde(default = "default_connect_backoff_ms")]
  pub connect_backoff_ms: u64,
  #[serde(default = "default_connect_max_retries")]
  pub connect_max_retries: u32,
}

fn default_connect_backoff_ms() -> u64 {
  1000
}

fn default_connect_max_retries() -> u32 {
  10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueNames {
  #[serde(default = "default_fetch_queue")]
  pub application_fetch: String,
  #[serde(default = "default_refresh_queue")]
  pub refresh_status: String,
  #[serde(default = "default_status_update_queue")]
  pub status_update: String,
  #[serde(default = "default_expiration_queue")]
  pub expiration: String,
  #[serde(default = "default_metrics_queue")]
  pub fetcher_metrics: String,
}

fn default_fetch_queue() -> String {
  "ApplicationFetchQueue".to_string()
}
fn default_refresh_queue() -> String {
  "RefreshStatusQueue".to_string()
}
fn default_status_update_queue() -> String {
  "StatusUpdateQueue".to_string()
}
fn default_expiration_queue() -> String {
  "ExpirationQueue".to_string()
}
fn default_metrics_queue() -> String {
  "FetcherMetricsQueue".to_string()
}

impl Default for QueueNames {
  fn default() -> Self {
    Self {
      application_fetch: default_fetch_queue(),
      refresh_status: default_refresh_queue(),
      status_update: default_status_update_queue(),
      expiration: default_expiration_queue(),
      fetcher_metrics: default_metrics_queue(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
  /// `SCHEDULER_PERIOD`: tick period of the ApplicationMonitor (§4.4).
  #[serde(default = "default_scheduler_period_secs")]
  pub scheduler_period_secs: u64,
  /// `REFRESH_PERIOD`: staleness threshold for non-NOT_FOUND applications.
  #[serde(default = "default_refresh_period_secs")]
  pub refresh_period_secs: u64,
  /// `NOT_FOUND_REFRESH_PERIOD`: staleness threshold for NOT_FOUND rows.
  #[serde(default = "default_not_found_refresh_period_secs")]
  pub not_found_refresh_period_secs: u64,
  /// `NOT_FOUND_MAX_DAYS`: age at which an unresolved NOT_FOUND row expires.
  #[serde(default = "default_not_found_max_days")]
  pub not_found_max_days: i64,
  #[serde(default = "default_fetch_jitter_max_ms")]
  pub fetch_jitter_max_ms: u64,
  #[serde(default = "default_cool_off_secs")]
  pub cool_off_secs: u64,
  #[serde(default = "default_max_job_retries")]
  pub max_job_retries: u32,
  #[serde(default = "default_dedup_ttl_secs")]
  pub dedup_ttl_secs: u64,
  #[serde(default = "default_timezone")]
  pub timezone: String,
}

fn default_scheduler_period_secs() -> u64 {
  3600
}
fn default_refresh_period_secs() -> u64 {
  3600
}
fn default_not_found_refresh_period_secs() -> u64 {
  21_600
}
fn default_not_found_max_days() -> i64 {
  180
}
fn default_fetch_jitter_max_ms() -> u64 {
  5000
}
fn default_cool_off_secs() -> u64 {
  60
}
fn default_max_job_retries() -> u32 {
  3
}
fn default_dedup_ttl_secs() -> u64 {
  300
}
fn default_timezone() -> String {
  "Europe/Prague".to_string()
}

impl Default for TimingConfig {
  fn default() -> Self {
    Self {
      scheduler_period_secs: default_scheduler_period_secs(),
      refresh_period_secs: default_refresh_period_secs(),
      not_found_refresh_period_secs: default_not_found_refresh_period_secs(),
      not_found_max_days: default_not_found_max_days(),
      fetch_jitter_max_ms: default_fetch_jitter_max_ms(),
      cool_off_secs: default_cool_off_secs(),
      max_job_retries: default_max_job_retries(),
      dedup_ttl_secs: default_dedup_ttl_secs(),
      timezone: default_timezone(),
    }
  }
}

/// Shared fragment embedded by each service's own `AppConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
  pub broker: BrokerConfig,
  pub db_url: String,
  #[serde(default)]
  pub queues: QueueNames,
  #[serde(default)]
  pub timing: TimingConfig,
}

/// Loads `<name>.yml` from the working directory, `/etc/config/<name>.yml`,
/// or the path named by `<ENV_VAR>`, in that order. Mirrors
/// `notify_server::config::AppConfig::load`.
pub fn load_yaml<T: for<'de> Deserialize<'de>>(name: &str, env_var: &str) -> Result<T> {
  let local = format!("{name}.yml");
  let system = format!("/etc/config/{name}.yml");

  let result: std::result::Result<T, serde_yaml::Error> = match (
    File::open(&local),
    File::open(&system),
    env::var(env_var),
  ) {
    (Ok(reader), _, _) => serde_yaml::from_reader(reader),
    (_, Ok(reader), _) => serde_yaml::from_reader(reader),
    (_, _, Ok(path)) => serde_yaml::from_reader(File::open(path)?),
    _ => bail!("config file not found: tried ./{local}, {system}, ${env_var}"),
  };

  Ok(result?)
}
