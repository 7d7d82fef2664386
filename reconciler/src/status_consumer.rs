//! `StatusConsumer`: the nine-step reconciliation algorithm from §4.5,
//! generalized from the teacher's `notify_server::events::processor` event
//! loop (single long-lived consumer task, ack/nack per message, `tracing`
//! spans per message) to this domain's queue and state machine.

use crate::notifier::Notifier;
use crate::templates;
use fabric::DedupCache;
use std::sync::Arc;
use tracker_core::contracts::Store;
use tracker_core::domain::classify_status;
use tracker_core::messages::{Fingerprint, StatusUpdateMessage};
use tracker_core::ApplicationState;
use tracing::{info, warn};

pub struct StatusConsumer<S: Store> {
  store: Arc<S>,
  dedup: Arc<DedupCache>,
  notifier: Arc<Notifier>,
}

impl<S: Store> StatusConsumer<S> {
  pub fn new(store: Arc<S>, dedup: Arc<DedupCache>, notifier: Arc<Notifier>) -> Self {
    Self { store, dedup, notifier }
  }

  /// Processes one `StatusUpdateQueue` message (§4.5 steps 1-9). Returns
  /// `true` when the message was durably handled and should be acked.
  pub async fn handle(&self, message: &StatusUpdateMessage) -> bool {
    // 1. discard the published-message dedup entry for this fingerprint.
    self.dedup.discard(Fingerprint::from_status_update(message));

    let key = message.key();

    // 2. fetch current DB status; nothing to reconcile if it's unknown.
    let subscriptions = match self.store.fetch_user_subscriptions(message.chat_id).await {
      Ok(subs) => subs,
      Err(error) => {
        warn!(%error, "failed to fetch subscriptions while reconciling");
        return false;
      }
    };
    let Some(current) = subscriptions.into_iter().find(|app| app.key == key) else {
      info!(chat_id = %message.chat_id, key = %key, "no stored application for status update, dropping");
      return true;
    };

    let received_status = message.status.clone().unwrap_or_default();

    // 3. has_changed.
    let has_changed = current.status != received_status;

    // 4. transient refresh failure never overwrites a known-good status.
    if message.failed && matches!(message.request_type, tracker_core::RequestType::Refresh) {
      return true;
    }

    // 5. defense in depth: the number must literally appear in the text.
    if !received_status.contains(&key.number) && !message.failed {
      warn!(key = %key, "received status does not mention application number, dropping");
      return true;
    }

    // 6. nothing to do.
    if !has_changed && !message.force_refresh {
      if let Err(error) = self.store.update_last_checked(message.chat_id, &key).await {
        warn!(%error, "failed to bump last_checked");
        return false;
      }
      return true;
    }

    let category = classify_status(&received_status);
    if category.is_none() {
      warn!(key = %key, status = %received_status, "unrecognized status category");
    }

    // 7. resolution + reminder-failure silence rule.
    let is_reminder = message.is_reminder();
    if message.failed && is_reminder {
      return true;
    }
    let is_resolved = category.map(|c| c.application_state().is_terminal()).unwrap_or(false)
      || (message.failed && matches!(message.request_type, tracker_core::RequestType::Fetch) && !is_reminder);

    let state = category.map(|c| c.application_state()).unwrap_or(ApplicationState::Unknown);

    // 8. persist.
    if let Err(error) = self
      .store
      .update_application_status(message.chat_id, &key, &received_status, is_resolved, state, has_changed)
      .await
    {
      warn!(%error, "failed to persist application status");
      return false;
    }

    // 9. notify.
    let lang = self.store.fetch_user_language(message.chat_id).await.ok().flatten().unwrap_or_default();
    let text = templates::status_notification(lang, &key, category, &received_status);
    if let Err(error) = self.notifier.notify(message.chat_id, &text).await {
      warn!(%error, chat_id = %message.chat_id, "failed to deliver notification");
    }

    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notifier::Notifier;
  use async_trait::async_trait;
  use chrono::Utc;
  use std::sync::Mutex;
  use std::time::Duration;
  use tracker_core::contracts::store::{Application, Reminder};
  use tracker_core::contracts::ChatSink;
  use tracker_core::error::{CoreError, TransportError};
  use tracker_core::ids::{ApplicationId, ReminderId};
  use tracker_core::retry::ExponentialBackoffRetry;
  use tracker_core::{ApplicationKey, Lang, UserId};

  struct FakeStore {
    applications: Mutex<Vec<Application>>,
    last_checked_bumped: Mutex<bool>,
  }

  fn sample_key() -> ApplicationKey {
    ApplicationKey {
      number: "12345".into(),
      suffix: None,
      application_type: "TP".into(),
      year: 2023,
    }
  }

  fn sample_application(status: &str) -> Application {
    Application {
      id: ApplicationId(1),
      user_id: UserId(7),
      key: sample_key(),
      status: status.to_string(),
      state: ApplicationState::Unknown,
      is_resolved: false,
      created_at: Utc::now(),
      last_updated: Utc::now(),
      changed_at: None,
    }
  }

  #[async_trait]
  impl Store for FakeStore {
    async fn insert_user(&self, _user_id: UserId, _lang: Lang) -> Result<(), CoreError> {
      Ok(())
    }
    async fn user_exists(&self, _user_id: UserId) -> Result<bool, CoreError> {
      Ok(true)
    }
    async fn update_user_language(&self, _user_id: UserId, _lang: Lang) -> Result<(), CoreError> {
      Ok(())
    }
    async fn fetch_user_language(&self, _user_id: UserId) -> Result<Option<Lang>, CoreError> {
      Ok(Some(Lang::En))
    }
    async fn insert_application(&self, _user_id: UserId, _key: &ApplicationKey) -> Result<ApplicationId, CoreError> {
      Ok(ApplicationId(1))
    }
    async fn delete_application(&self, _user_id: UserId, _key: &ApplicationKey) -> Result<bool, CoreError> {
      Ok(true)
    }
    async fn subscription_exists(&self, _user_id: UserId, _key: &ApplicationKey) -> Result<bool, CoreError> {
      Ok(true)
    }
    async fn count_user_subscriptions(&self, _user_id: UserId) -> Result<i64, CoreError> {
      Ok(self.applications.lock().unwrap().len() as i64)
    }
    async fn fetch_user_subscriptions(&self, _user_id: UserId) -> Result<Vec<Application>, CoreError> {
      Ok(self.applications.lock().unwrap().clone())
    }
    async fn update_application_status(
      &self,
      _user_id: UserId,
      key: &ApplicationKey,
      status: &str,
      is_resolved: bool,
      state: ApplicationState,
      _has_changed: bool,
    ) -> Result<(), CoreError> {
      let mut applications = self.applications.lock().unwrap();
      if let Some(app) = applications.iter_mut().find(|a| &a.key == key) {
        app.status = status.to_string();
        app.is_resolved = is_resolved;
        app.state = state;
      }
      Ok(())
    }
    async fn update_last_checked(&self, _user_id: UserId, _key: &ApplicationKey) -> Result<(), CoreError> {
      *self.last_checked_bumped.lock().unwrap() = true;
      Ok(())
    }
    async fn fetch_applications_needing_update(
      &self,
      _refresh: chrono::Duration,
      _not_found_refresh: chrono::Duration,
    ) -> Result<Vec<Application>, CoreError> {
      Ok(vec![])
    }
    async fn fetch_applications_to_expire(&self, _max_age: chrono::Duration) -> Result<Vec<Application>, CoreError> {
      Ok(vec![])
    }
    async fn resolve_application(&self, _id: ApplicationId) -> Result<(), CoreError> {
      Ok(())
    }
    async fn insert_reminder(
      &self,
      _user_id: UserId,
      _key: &ApplicationKey,
      _remind_at: chrono::DateTime<Utc>,
    ) -> Result<ReminderId, CoreError> {
      Ok(ReminderId(1))
    }
    async fn delete_reminder(&self, _id: ReminderId) -> Result<bool, CoreError> {
      Ok(true)
    }
    async fn fetch_user_reminders(&self, _user_id: UserId) -> Result<Vec<Reminder>, CoreError> {
      Ok(vec![])
    }
    async fn fetch_due_reminders(&self, _hour: u32, _minute: u32) -> Result<Vec<Reminder>, CoreError> {
      Ok(vec![])
    }
    async fn fetch_all_chat_ids(&self) -> Result<Vec<UserId>, CoreError> {
      Ok(vec![])
    }
  }

  struct RecordingSink {
    sent: Mutex<Vec<String>>,
  }

  #[async_trait]
  impl ChatSink for RecordingSink {
    async fn send(&self, _chat_id: UserId, text: &str) -> Result<(), TransportError> {
      self.sent.lock().unwrap().push(text.to_string());
      Ok(())
    }
  }

  fn make_consumer(store: Arc<FakeStore>) -> (StatusConsumer<FakeStore>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink { sent: Mutex::new(vec![]) });
    let notifier = Arc::new(Notifier::new(sink.clone(), ExponentialBackoffRetry::new(1, 2)));
    let dedup = Arc::new(DedupCache::new(Duration::from_secs(60)));
    (StatusConsumer::new(store, dedup, notifier), sink)
  }

  fn base_message() -> StatusUpdateMessage {
    StatusUpdateMessage {
      chat_id: UserId(7),
      number: "12345".into(),
      suffix: None,
      application_type: "TP".into(),
      year: 2023,
      request_type: tracker_core::RequestType::Refresh,
      force_refresh: false,
      failed: false,
      is_reminder: None,
      last_updated: "0".into(),
      status: Some("v-prubehu-rizeni".into()),
      application_id: Some(1),
    }
  }

  #[tokio::test]
  async fn changed_status_persists_and_notifies() {
    let store = Arc::new(FakeStore {
      applications: Mutex::new(vec![sample_application("nebylo nalezeno")]),
      last_checked_bumped: Mutex::new(false),
    });
    let (consumer, sink) = make_consumer(store.clone());

    let handled = consumer.handle(&base_message()).await;

    assert!(handled);
    assert_eq!(store.applications.lock().unwrap()[0].status, "v-prubehu-rizeni");
    assert_eq!(sink.sent.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unchanged_status_without_force_refresh_only_bumps_last_checked() {
    let store = Arc::new(FakeStore {
      applications: Mutex::new(vec![sample_application("v-prubehu-rizeni")]),
      last_checked_bumped: Mutex::new(false),
    });
    let (consumer, sink) = make_consumer(store.clone());

    let handled = consumer.handle(&base_message()).await;

    assert!(handled);
    assert!(*store.last_checked_bumped.lock().unwrap());
    assert!(sink.sent.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn failed_refresh_is_silently_dropped() {
    let store = Arc::new(FakeStore {
      applications: Mutex::new(vec![sample_application("v-prubehu-rizeni")]),
      last_checked_bumped: Mutex::new(false),
    });
    let (consumer, sink) = make_consumer(store.clone());

    let mut message = base_message();
    message.failed = true;

    let handled = consumer.handle(&message).await;

    assert!(handled);
    assert_eq!(store.applications.lock().unwrap()[0].status, "v-prubehu-rizeni");
    assert!(sink.sent.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn number_mismatch_is_dropped() {
    let store = Arc::new(FakeStore {
      applications: Mutex::new(vec![sample_application("nebylo nalezeno")]),
      last_checked_bumped: Mutex::new(false),
    });
    let (consumer, sink) = make_consumer(store.clone());

    let mut message = base_message();
    message.status = Some("bylo povoleno for 99999".into());

    let handled = consumer.handle(&message).await;

    assert!(handled);
    assert_eq!(store.applications.lock().unwrap()[0].status, "nebylo nalezeno");
    assert!(sink.sent.lock().unwrap().is_empty());
  }
}
