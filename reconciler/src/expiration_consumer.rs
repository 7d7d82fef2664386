//! Handles `ExpirationQueue` messages: resolves the stale `NOT_FOUND`
//! application and sends a notice (§4.5 Expiration consumer).

use crate::notifier::Notifier;
use crate::templates;
use std::sync::Arc;
use tracker_core::contracts::Store;
use tracker_core::messages::JobMessage;
use tracing::warn;

pub struct ExpirationConsumer<S: Store> {
  store: Arc<S>,
  notifier: Arc<Notifier>,
}

impl<S: Store> ExpirationConsumer<S> {
  pub fn new(store: Arc<S>, notifier: Arc<Notifier>) -> Self {
    Self { store, notifier }
  }

  pub async fn handle(&self, message: &JobMessage) -> bool {
    let key = message.key();
    let Some(application_id) = message.application_id else {
      warn!(key = %key, "expiration message missing application_id");
      return true;
    };

    if let Err(error) = self.store.resolve_application(tracker_core::ids::ApplicationId(application_id)).await {
      warn!(%error, key = %key, "failed to resolve expiring application");
      return false;
    }

    let lang = self.store.fetch_user_language(message.chat_id).await.ok().flatten().unwrap_or_default();
    let text = templates::expired_notification(lang, &key);
    if let Err(error) = self.notifier.notify(message.chat_id, &text).await {
      warn!(%error, chat_id = %message.chat_id, "failed to deliver expiration notice");
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
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Mutex;
  use tracker_core::contracts::store::{Application, Reminder};
  use tracker_core::contracts::ChatSink;
  use tracker_core::domain::{ApplicationKey, ApplicationState, Lang};
  use tracker_core::error::{CoreError, TransportError};
  use tracker_core::ids::{ApplicationId, ReminderId};
  use tracker_core::retry::ExponentialBackoffRetry;
  use tracker_core::{RequestType, UserId};

  struct FakeStore {
    resolved: Mutex<Vec<ApplicationId>>,
    resolve_fails: AtomicBool,
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
      Ok(0)
    }
    async fn fetch_user_subscriptions(&self, _user_id: UserId) -> Result<Vec<Application>, CoreError> {
      Ok(vec![])
    }
    async fn update_application_status(
      &self,
      _user_id: UserId,
      _key: &ApplicationKey,
      _status: &str,
      _is_resolved: bool,
      _state: ApplicationState,
      _has_changed: bool,
    ) -> Result<(), CoreError> {
      Ok(())
    }
    async fn update_last_checked(&self, _user_id: UserId, _key: &ApplicationKey) -> Result<(), CoreError> {
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
    async fn resolve_application(&self, id: ApplicationId) -> Result<(), CoreError> {
      if self.resolve_fails.load(Ordering::SeqCst) {
        return Err(CoreError::Database("resolve failed".into()));
      }
      self.resolved.lock().unwrap().push(id);
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

  fn base_message() -> JobMessage {
    JobMessage {
      chat_id: UserId(7),
      number: "12345".into(),
      suffix: None,
      application_type: "TP".into(),
      year: 2023,
      request_type: RequestType::Expire,
      force_refresh: false,
      failed: false,
      is_reminder: None,
      last_updated: "0".into(),
      application_id: Some(1),
    }
  }

  #[tokio::test]
  async fn resolves_and_notifies() {
    let store = Arc::new(FakeStore {
      resolved: Mutex::new(vec![]),
      resolve_fails: AtomicBool::new(false),
    });
    let sink = Arc::new(RecordingSink { sent: Mutex::new(vec![]) });
    let notifier = Arc::new(Notifier::new(sink.clone(), ExponentialBackoffRetry::new(1, 2)));
    let consumer = ExpirationConsumer::new(store.clone(), notifier);

    let handled = consumer.handle(&base_message()).await;

    assert!(handled);
    assert_eq!(store.resolved.lock().unwrap().as_slice(), &[ApplicationId(1)]);
    assert_eq!(sink.sent.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn missing_application_id_is_dropped_without_resolving() {
    let store = Arc::new(FakeStore {
      resolved: Mutex::new(vec![]),
      resolve_fails: AtomicBool::new(false),
    });
    let sink = Arc::new(RecordingSink { sent: Mutex::new(vec![]) });
    let notifier = Arc::new(Notifier::new(sink.clone(), ExponentialBackoffRetry::new(1, 2)));
    let consumer = ExpirationConsumer::new(store.clone(), notifier);

    let mut message = base_message();
    message.application_id = None;

    let handled = consumer.handle(&message).await;

    assert!(handled);
    assert!(store.resolved.lock().unwrap().is_empty());
    assert!(sink.sent.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn store_failure_is_not_acked() {
    let store = Arc::new(FakeStore {
      resolved: Mutex::new(vec![]),
      resolve_fails: AtomicBool::new(true),
    });
    let sink = Arc::new(RecordingSink { sent: Mutex::new(vec![]) });
    let notifier = Arc::new(Notifier::new(sink.clone(), ExponentialBackoffRetry::new(1, 2)));
    let consumer = ExpirationConsumer::new(store.clone(), notifier);

    let handled = consumer.handle(&base_message()).await;

    assert!(!handled);
    assert!(sink.sent.lock().unwrap().is_empty());
  }
}
