//! Newtype wrappers for the ID types shared across every service.
//!
//! These exist for the same reason as the teacher's `fechatter_core::models::ids`:
//! they keep `UserId` and `ApplicationId` from being silently swapped at a call
//! site that just takes `i64`.

use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;

/// Telegram-style opaque chat identity. Never deleted once created (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Primary key of a stored `Applications` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

/// Primary key of a stored `Reminders` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ReminderId(pub i64);

/// Identity of a fetcher worker process, used as the Metrics Hub cache key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetcherId(pub String);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl fmt::Display for ApplicationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl fmt::Display for ReminderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl fmt::Display for FetcherId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<i64> for UserId {
  fn from(v: i64) -> Self {
    UserId(v)
  }
}

impl From<i64> for ApplicationId {
  fn from(v: i64) -> Self {
    ApplicationId(v)
  }
}
