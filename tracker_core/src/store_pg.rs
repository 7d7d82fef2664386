//! Postgres-backed [`Store`], using the raw `sqlx::query`/`Row::get` style
//! from `notify_server::state::app_state::AppStateInner`'s chat-membership
//! queries rather than the `query!` macro, since this schema is new and has
//! no migration-time check available in this workspace.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use crate::contracts::store::{Application, Reminder, Store};
use crate::domain::{ApplicationKey, ApplicationState, Lang};
use crate::error::CoreError;
use crate::ids::{ApplicationId, ReminderId, UserId};

pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(db_url: &str) -> Result<Self, CoreError> {
    let pool = PgPool::connect(db_url)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(Self { pool })
  }

  fn row_to_application(row: &sqlx::postgres::PgRow) -> Result<Application, CoreError> {
    let key_str: String = row.get("application_key");
    let key = ApplicationKey::from_str(&key_str).map_err(|e| CoreError::Internal(e.to_string()))?;
    let state_str: String = row.get("state");
    let state = parse_state(&state_str)?;
    Ok(Application {
      id: ApplicationId(row.get("id")),
      user_id: UserId(row.get("user_id")),
      key,
      status: row.get("status"),
      state,
      is_resolved: row.get("is_resolved"),
      created_at: row.get("created_at"),
      last_updated: row.get("last_updated"),
      changed_at: row.get("changed_at"),
    })
  }
}

fn parse_state(raw: &str) -> Result<ApplicationState, CoreError> {
  match raw {
    "UNKNOWN" => Ok(ApplicationState::Unknown),
    "NOT_FOUND" => Ok(ApplicationState::NotFound),
    "IN_PROGRESS" => Ok(ApplicationState::InProgress),
    "APPROVED" => Ok(ApplicationState::Approved),
    "DENIED" => Ok(ApplicationState::Denied),
    other => Err(CoreError::Internal(format!("unrecognized state '{other}'"))),
  }
}

#[async_trait]
impl Store for PgStore {
  async fn insert_user(&self, user_id: UserId, lang: Lang) -> Result<(), CoreError> {
    sqlx::query("INSERT INTO users (id, lang) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING")
      .bind(user_id.0)
      .bind(lang.to_string())
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(())
  }

  async fn user_exists(&self, user_id: UserId) -> Result<bool, CoreError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE id = $1")
      .bind(user_id.0)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    let count: i64 = row.get("count");
    Ok(count > 0)
  }

  async fn update_user_language(&self, user_id: UserId, lang: Lang) -> Result<(), CoreError> {
    sqlx::query("UPDATE users SET lang = $1 WHERE id = $2")
      .bind(lang.to_string())
      .bind(user_id.0)
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(())
  }

  async fn fetch_user_language(&self, user_id: UserId) -> Result<Option<Lang>, CoreError> {
    let row = sqlx::query("SELECT lang FROM users WHERE id = $1")
      .bind(user_id.0)
      .fetch_optional(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    match row {
      Some(row) => {
        let lang: String = row.get("lang");
        Ok(match lang.as_str() {
          "EN" => Some(Lang::En),
          "CZ" => Some(Lang::Cz),
          "RU" => Some(Lang::Ru),
          "UA" => Some(Lang::Ua),
          _ => None,
        })
      }
      None => Ok(None),
    }
  }

  async fn insert_application(&self, user_id: UserId, key: &ApplicationKey) -> Result<ApplicationId, CoreError> {
    let row = sqlx::query(
      "INSERT INTO applications (user_id, application_key, status, state, is_resolved, created_at, last_updated)
       VALUES ($1, $2, '', 'UNKNOWN', false, now(), now())
       RETURNING id",
    )
    .bind(user_id.0)
    .bind(key.to_string())
    .fetch_one(&self.pool)
    .await
    .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(ApplicationId(row.get("id")))
  }

  async fn delete_application(&self, user_id: UserId, key: &ApplicationKey) -> Result<bool, CoreError> {
    let result = sqlx::query("DELETE FROM applications WHERE user_id = $1 AND application_key = $2")
      .bind(user_id.0)
      .bind(key.to_string())
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(result.rows_affected() > 0)
  }

  async fn subscription_exists(&self, user_id: UserId, key: &ApplicationKey) -> Result<bool, CoreError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM applications WHERE user_id = $1 AND application_key = $2")
      .bind(user_id.0)
      .bind(key.to_string())
      .fetch_one(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    let count: i64 = row.get("count");
    Ok(count > 0)
  }

  async fn count_user_subscriptions(&self, user_id: UserId) -> Result<i64, CoreError> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM applications WHERE user_id = $1 AND is_resolved = false")
      .bind(user_id.0)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(row.get("count"))
  }

  async fn fetch_user_subscriptions(&self, user_id: UserId) -> Result<Vec<Application>, CoreError> {
    let rows = sqlx::query("SELECT * FROM applications WHERE user_id = $1")
      .bind(user_id.0)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    rows.iter().map(Self::row_to_application).collect()
  }

  async fn update_application_status(
    &self,
    user_id: UserId,
    key: &ApplicationKey,
    status: &str,
    is_resolved: bool,
    state: ApplicationState,
    has_changed: bool,
  ) -> Result<(), CoreError> {
    if has_changed {
      sqlx::query(
        "UPDATE applications
         SET status = $1, is_resolved = $2, state = $3, last_updated = now(), changed_at = now()
         WHERE user_id = $4 AND application_key = $5",
      )
      .bind(status)
      .bind(is_resolved)
      .bind(state.to_string())
      .bind(user_id.0)
      .bind(key.to_string())
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    } else {
      sqlx::query(
        "UPDATE applications
         SET status = $1, is_resolved = $2, state = $3, last_updated = now()
         WHERE user_id = $4 AND application_key = $5",
      )
      .bind(status)
      .bind(is_resolved)
      .bind(state.to_string())
      .bind(user_id.0)
      .bind(key.to_string())
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    }
    Ok(())
  }

  async fn update_last_checked(&self, user_id: UserId, key: &ApplicationKey) -> Result<(), CoreError> {
    sqlx::query("UPDATE applications SET last_updated = now() WHERE user_id = $1 AND application_key = $2")
      .bind(user_id.0)
      .bind(key.to_string())
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(())
  }

  async fn fetch_applications_needing_update(
    &self,
    refresh: Duration,
    not_found_refresh: Duration,
  ) -> Result<Vec<Application>, CoreError> {
    let rows = sqlx::query(
      "SELECT * FROM applications
       WHERE is_resolved = false
         AND (
           (state <> 'NOT_FOUND' AND now() - last_updated > $1::interval)
           OR (state = 'NOT_FOUND' AND now() - last_updated > $2::interval)
         )",
    )
    .bind(format!("{} seconds", refresh.num_seconds()))
    .bind(format!("{} seconds", not_found_refresh.num_seconds()))
    .fetch_all(&self.pool)
    .await
    .map_err(|e| CoreError::Database(e.to_string()))?;
    rows.iter().map(Self::row_to_application).collect()
  }

  async fn fetch_applications_to_expire(&self, max_age: Duration) -> Result<Vec<Application>, CoreError> {
    let rows = sqlx::query(
      "SELECT * FROM applications
       WHERE is_resolved = false AND state = 'NOT_FOUND' AND now() - created_at > $1::interval",
    )
    .bind(format!("{} seconds", max_age.num_seconds()))
    .fetch_all(&self.pool)
    .await
    .map_err(|e| CoreError::Database(e.to_string()))?;
    rows.iter().map(Self::row_to_application).collect()
  }

  async fn resolve_application(&self, id: ApplicationId) -> Result<(), CoreError> {
    sqlx::query("UPDATE applications SET is_resolved = true WHERE id = $1")
      .bind(id.0)
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(())
  }

  async fn insert_reminder(&self, user_id: UserId, key: &ApplicationKey, remind_at: DateTime<Utc>) -> Result<ReminderId, CoreError> {
    let row = sqlx::query(
      "INSERT INTO reminders (user_id, application_key, remind_at) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id.0)
    .bind(key.to_string())
    .bind(remind_at)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(ReminderId(row.get("id")))
  }

  async fn delete_reminder(&self, id: ReminderId) -> Result<bool, CoreError> {
    let result = sqlx::query("DELETE FROM reminders WHERE id = $1")
      .bind(id.0)
      .execute(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(result.rows_affected() > 0)
  }

  async fn fetch_user_reminders(&self, user_id: UserId) -> Result<Vec<Reminder>, CoreError> {
    let rows = sqlx::query("SELECT * FROM reminders WHERE user_id = $1")
      .bind(user_id.0)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    rows
      .iter()
      .map(|row| {
        let key_str: String = row.get("application_key");
        let application_key = ApplicationKey::from_str(&key_str).map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(Reminder {
          id: ReminderId(row.get("id")),
          user_id: UserId(row.get("user_id")),
          application_key,
          remind_at: row.get("remind_at"),
        })
      })
      .collect()
  }

  async fn fetch_due_reminders(&self, hour: u32, minute: u32) -> Result<Vec<Reminder>, CoreError> {
    let tz: Tz = "Europe/Prague".parse().map_err(|_| CoreError::Internal("invalid timezone".into()))?;
    let now_local = Utc::now().with_timezone(&tz);
    let window_start = tz
      .with_ymd_and_hms(now_local.year(), now_local.month(), now_local.day(), hour, minute, 0)
      .single()
      .ok_or_else(|| CoreError::Internal("ambiguous local time".into()))?;
    let window_end = window_start + Duration::minutes(1);

    let rows = sqlx::query("SELECT * FROM reminders WHERE remind_at >= $1 AND remind_at < $2")
      .bind(window_start.with_timezone(&Utc))
      .bind(window_end.with_timezone(&Utc))
      .fetch_all(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    rows
      .iter()
      .map(|row| {
        let key_str: String = row.get("application_key");
        let application_key = ApplicationKey::from_str(&key_str).map_err(|e| CoreError::Internal(e.to_string()))?;
        Ok(Reminder {
          id: ReminderId(row.get("id")),
          user_id: UserId(row.get("user_id")),
          application_key,
          remind_at: row.get("remind_at"),
        })
      })
      .collect()
  }

  async fn fetch_all_chat_ids(&self) -> Result<Vec<UserId>, CoreError> {
    let rows = sqlx::query("SELECT id FROM users")
      .fetch_all(&self.pool)
      .await
      .map_err(|e| CoreError::Database(e.to_string()))?;
    Ok(rows.iter().map(|row| UserId(row.get("id"))).collect())
  }
}
