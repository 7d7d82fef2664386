//! Wire schema shared by every queue in §6: `JobMessage` travels on
//! `ApplicationFetchQueue` / `RefreshStatusQueue` / `ExpirationQueue`,
//! `StatusUpdateMessage` travels back on `StatusUpdateQueue`.

use crate::domain::ApplicationKey;
use crate::ids::{FetcherId, UserId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
  Fetch,
  Refresh,
  Expire,
}

impl RequestType {
  pub fn as_str(self) -> &'static str {
    match self {
      RequestType::Fetch => "fetch",
      RequestType::Refresh => "refresh",
      RequestType::Expire => "expire",
    }
  }
}

/// In-flight job message. `last_updated` is carried as an ISO string ("0" if
/// absent) to match the wire schema in §6 byte-for-byte rather than an
/// optional typed timestamp, since it round-trips through JSON unchanged and
/// participates in the fingerprint hash as raw text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
  pub chat_id: UserId,
  pub number: String,
  pub suffix: Option<String>,
  #[serde(rename = "type")]
  pub application_type: String,
  pub year: i32,
  pub request_type: RequestType,
  #[serde(default)]
  pub force_refresh: bool,
  #[serde(default)]
  pub failed: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_reminder: Option<bool>,
  #[serde(default = "zero_last_updated")]
  pub last_updated: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub application_id: Option<i64>,
}

fn zero_last_updated() -> String {
  "0".to_string()
}

impl JobMessage {
  pub fn key(&self) -> ApplicationKey {
    ApplicationKey {
      number: self.number.clone(),
      suffix: self.suffix.clone(),
      application_type: self.application_type.clone(),
      year: self.year,
    }
  }

  pub fn is_reminder(&self) -> bool {
    self.is_reminder.unwrap_or(false)
  }
}

/// Reply message published by the fetcher onto `StatusUpdateQueue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateMessage {
  pub chat_id: UserId,
  pub number: String,
  pub suffix: Option<String>,
  #[serde(rename = "type")]
  pub application_type: String,
  pub year: i32,
  pub request_type: RequestType,
  #[serde(default)]
  pub force_refresh: bool,
  #[serde(default)]
  pub failed: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_reminder: Option<bool>,
  #[serde(default = "zero_last_updated")]
  pub last_updated: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub application_id: Option<i64>,
}

impl StatusUpdateMessage {
  pub fn key(&self) -> ApplicationKey {
    ApplicationKey {
      number: self.number.clone(),
      suffix: self.suffix.clone(),
      application_type: self.application_type.clone(),
      year: self.year,
    }
  }

  pub fn is_reminder(&self) -> bool {
    self.is_reminder.unwrap_or(false)
  }
}

impl From<JobMessage> for StatusUpdateMessage {
  fn from(job: JobMessage) -> Self {
    StatusUpdateMessage {
      chat_id: job.chat_id,
      number: job.number,
      suffix: job.suffix,
      application_type: job.application_type,
      year: job.year,
      request_type: job.request_type,
      force_refresh: job.force_refresh,
      failed: job.failed,
      is_reminder: job.is_reminder,
      last_updated: job.last_updated,
      status: None,
      application_id: job.application_id,
    }
  }
}

/// Dedup key over request-identifying fields, deliberately excluding status
/// text (§3 Published-Message Cache): it identifies a *request* for a given
/// observation window, not its eventual answer. Ported from
/// `RabbitMQ.generate_unique_id` in `bot/rabbitmq.py`, using sha256 (already
/// in the teacher's dependency set) instead of inventing an md5 dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
  pub fn new(request_type: RequestType, chat_id: UserId, key: &ApplicationKey, last_updated: &str) -> Self {
    let mut hasher = Sha256::new();
    hasher.update(request_type.as_str().as_bytes());
    hasher.update(b"_");
    hasher.update(chat_id.0.to_string().as_bytes());
    hasher.update(b"_");
    hasher.update(key.number.as_bytes());
    hasher.update(b"_");
    hasher.update(key.application_type.as_bytes());
    hasher.update(b"_");
    hasher.update(key.year.to_string().as_bytes());
    hasher.update(b"_");
    hasher.update(last_updated.as_bytes());
    Fingerprint(hasher.finalize().into())
  }

  pub fn from_job(message: &JobMessage) -> Self {
    Self::new(message.request_type, message.chat_id, &message.key(), &message.last_updated)
  }

  pub fn from_status_update(message: &StatusUpdateMessage) -> Self {
    Self::new(message.request_type, message.chat_id, &message.key(), &message.last_updated)
  }

  pub fn to_hex(self) -> String {
    hex::encode(self.0)
  }
}

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.to_hex())
  }
}

/// One fetcher's self-reported snapshot, published onto `FetcherMetricsQueue`
/// in response to a [`crate::contracts::Broker::request_fetcher_metrics`]
/// broadcast or on its own periodic timer (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherMetricsMessage {
  pub fetcher_id: FetcherId,
  pub success_count: u64,
  pub failed_count: u64,
  pub retried_count: u64,
  pub avg_latency_ms: f64,
  pub waiting: i64,
  pub locked: i64,
  pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_key() -> ApplicationKey {
    ApplicationKey {
      number: "12345".into(),
      suffix: None,
      application_type: "TP".into(),
      year: 2023,
    }
  }

  #[test]
  fn same_inputs_produce_same_fingerprint() {
    let a = Fingerprint::new(RequestType::Refresh, UserId(42), &sample_key(), "0");
    let b = Fingerprint::new(RequestType::Refresh, UserId(42), &sample_key(), "0");
    assert_eq!(a, b);
  }

  #[test]
  fn status_text_does_not_affect_fingerprint() {
    let job = JobMessage {
      chat_id: UserId(1),
      number: "12345".into(),
      suffix: None,
      application_type: "TP".into(),
      year: 2023,
      request_type: RequestType::Refresh,
      force_refresh: false,
      failed: false,
      is_reminder: None,
      last_updated: "0".into(),
      application_id: None,
    };
    let mut reply: StatusUpdateMessage = job.clone().into();
    reply.status = Some("zpracovává se".into());
    let mut reply_other_status: StatusUpdateMessage = job.clone().into();
    reply_other_status.status = Some("bylo povoleno".into());

    assert_eq!(
      Fingerprint::from_status_update(&reply),
      Fingerprint::from_status_update(&reply_other_status)
    );
    assert_eq!(Fingerprint::from_job(&job), Fingerprint::from_status_update(&reply));
  }

  #[test]
  fn different_last_updated_changes_fingerprint() {
    let a = Fingerprint::new(RequestType::Refresh, UserId(42), &sample_key(), "0");
    let b = Fingerprint::new(
      RequestType::Refresh,
      UserId(42),
      &sample_key(),
      "2024-01-01T00:00:00Z",
    );
    assert_ne!(a, b);
  }
}
