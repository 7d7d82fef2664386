//! Persistence contract (§4.2): a thin asynchronous API over the relational
//! store, with no multi-statement transactions. Named and shaped after the
//! teacher's `fechatter_core::contracts::repositories` traits (one method per
//! operation, `Result<_, CoreError>` throughout), generalized from the
//! teacher's per-entity repositories into the single `Store` surface the
//! spec names.

use crate::domain::{ApplicationKey, ApplicationState, Lang};
use crate::error::CoreError;
use crate::ids::{ApplicationId, ReminderId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A persisted subscription row (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
  pub id: ApplicationId,
  pub user_id: UserId,
  pub key: ApplicationKey,
  pub status: String,
  pub state: ApplicationState,
  pub is_resolved: bool,
  pub created_at: DateTime<Utc>,
  pub last_updated: DateTime<Utc>,
  pub changed_at: Option<DateTime<Utc>>,
}

/// A persisted due-date reminder (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
  pub id: ReminderId,
  pub user_id: UserId,
  pub application_key: ApplicationKey,
  pub remind_at: DateTime<Utc>,
}

/// Caps `CountUserSubscriptions` against; enforced by the dialog, not the
/// store (§4.8).
pub const MAX_SUBSCRIPTIONS_PER_USER: i64 = 5;

#[async_trait]
pub trait Store: Send + Sync {
  async fn insert_user(&self, user_id: UserId, lang: Lang) -> Result<(), CoreError>;
  async fn user_exists(&self, user_id: UserId) -> Result<bool, CoreError>;
  async fn update_user_language(&self, user_id: UserId, lang: Lang) -> Result<(), CoreError>;
  async fn fetch_user_language(&self, user_id: UserId) -> Result<Option<Lang>, CoreError>;

  async fn insert_application(&self, user_id: UserId, key: &ApplicationKey) -> Result<ApplicationId, CoreError>;
  async fn delete_application(&self, user_id: UserId, key: &ApplicationKey) -> Result<bool, CoreError>;
  async fn subscription_exists(&self, user_id: UserId, key: &ApplicationKey) -> Result<bool, CoreError>;
  async fn count_user_subscriptions(&self, user_id: UserId) -> Result<i64, CoreError>;
  async fn fetch_user_subscriptions(&self, user_id: UserId) -> Result<Vec<Application>, CoreError>;

  /// Atomic: sets `last_updated=now`; when `has_changed`, also sets
  /// `changed_at=now` (§4.2).
  async fn update_application_status(
    &self,
    user_id: UserId,
    key: &ApplicationKey,
    status: &str,
    is_resolved: bool,
    state: ApplicationState,
    has_changed: bool,
  ) -> Result<(), CoreError>;

  /// Bumps `last_updated` only, leaving `status`/`state` untouched. Scoped
  /// by `user_id` as well as `key`, since the same `ApplicationKey` can be
  /// subscribed to by more than one user.
  async fn update_last_checked(&self, user_id: UserId, key: &ApplicationKey) -> Result<(), CoreError>;

  /// Unresolved rows where either `state != NOT_FOUND` and
  /// `now - last_updated > refresh`, or `state == NOT_FOUND` and
  /// `now - last_updated > not_found_refresh` (§4.2).
  async fn fetch_applications_needing_update(
    &self,
    refresh: chrono::Duration,
    not_found_refresh: chrono::Duration,
  ) -> Result<Vec<Application>, CoreError>;

  /// Unresolved `NOT_FOUND` rows older than `max_age`, measured from
  /// `created_at` (§4.2).
  async fn fetch_applications_to_expire(&self, max_age: chrono::Duration) -> Result<Vec<Application>, CoreError>;

  async fn resolve_application(&self, id: ApplicationId) -> Result<(), CoreError>;

  async fn insert_reminder(&self, user_id: UserId, key: &ApplicationKey, remind_at: DateTime<Utc>) -> Result<ReminderId, CoreError>;
  async fn delete_reminder(&self, id: ReminderId) -> Result<bool, CoreError>;
  async fn fetch_user_reminders(&self, user_id: UserId) -> Result<Vec<Reminder>, CoreError>;

  /// Reminders due at `hour:minute` in the fixed civil timezone (§4.2, §6).
  async fn fetch_due_reminders(&self, hour: u32, minute: u32) -> Result<Vec<Reminder>, CoreError>;

  /// Broadcasts every known chat id, used to fan out `FetchAllChatIds`
  /// (§4.2, supplemented feature).
  async fn fetch_all_chat_ids(&self) -> Result<Vec<UserId>, CoreError>;
}
