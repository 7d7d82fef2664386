//! Subscription dialog contract (§4.8). This is documentation-only: the
//! dialog itself is an external collaborator that merely has to respect the
//! grammar and caps below when creating the rows [`crate::contracts::Store`]
//! persists. There is no Rust trait to implement here, only invariants every
//! caller of `Store::insert_application` / `insert_reminder` must uphold.

use crate::domain::ApplicationKey;
use crate::contracts::store::MAX_SUBSCRIPTIONS_PER_USER;

/// Max active subscriptions per user (§4.8).
pub const MAX_ACTIVE_SUBSCRIPTIONS: i64 = MAX_SUBSCRIPTIONS_PER_USER;

/// Max `subscribe` invocations per rolling 24h window, admin-exempt (§4.8).
pub const MAX_SUBSCRIBE_CALLS_PER_DAY: u32 = 5;

/// Max reminders per user (§4.8).
pub const MAX_REMINDERS_PER_USER: usize = 2;

/// A marker validating that an [`ApplicationKey`] satisfies the dialog's
/// grammar and allow-lists before it reaches the store. Parsing via
/// `ApplicationKey::from_str` already enforces the grammar; this adds the
/// type/year allow-list checks the dialog is responsible for (§4.8).
pub trait SubscriptionDialog {
  fn validate(&self, key: &ApplicationKey, current_year: i32) -> Result<(), DialogValidationError>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DialogValidationError {
  #[error("application type '{0}' is not one of the allowed types")]
  DisallowedType(String),
  #[error("year {0} is outside the allowed window")]
  DisallowedYear(i32),
  #[error("user already has {0} active subscriptions, the maximum is {1}")]
  SubscriptionCapReached(i64, i64),
  #[error("user already has {0} reminders, the maximum is {1}")]
  ReminderCapReached(usize, usize),
}

/// Default validator applying only the grammar/allow-list rules; cap checks
/// need store state and are performed by the caller (§4.8).
pub struct GrammarOnlyDialog;

impl SubscriptionDialog for GrammarOnlyDialog {
  fn validate(&self, key: &ApplicationKey, current_year: i32) -> Result<(), DialogValidationError> {
    if !key.is_allowed_type() {
      return Err(DialogValidationError::DisallowedType(key.application_type.clone()));
    }
    if !key.is_allowed_year(current_year) {
      return Err(DialogValidationError::DisallowedYear(key.year));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(application_type: &str, year: i32) -> ApplicationKey {
    ApplicationKey {
      number: "12345".into(),
      suffix: None,
      application_type: application_type.into(),
      year,
    }
  }

  #[test]
  fn accepts_allowed_type_and_year() {
    assert!(GrammarOnlyDialog.validate(&key("TP", 2023), 2023).is_ok());
  }

  #[test]
  fn rejects_disallowed_type() {
    assert_eq!(
      GrammarOnlyDialog.validate(&key("XX", 2023), 2023),
      Err(DialogValidationError::DisallowedType("XX".into()))
    );
  }

  #[test]
  fn rejects_year_outside_window() {
    assert_eq!(
      GrammarOnlyDialog.validate(&key("TP", 2018), 2023),
      Err(DialogValidationError::DisallowedYear(2018))
    );
  }
}
