//! The three cooperative monitor loops (§4.4), each cancellable through a
//! shared `CancellationToken` so a timed sleep is interrupted immediately
//! on shutdown rather than run to completion.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracker_core::contracts::{Broker, Store};
use tracker_core::messages::{JobMessage, RequestType};
use tracing::{error, info};

async fn sleep_or_cancel(duration: Duration, shutdown: &CancellationToken) -> bool {
  tokio::select! {
    _ = tokio::time::sleep(duration) => true,
    _ = shutdown.cancelled() => false,
  }
}

/// §4.4 ApplicationMonitor: emits refresh and expiration jobs every tick.
pub async fn application_monitor<S: Store, B: Broker>(
  store: Arc<S>,
  broker: Arc<B>,
  period: Duration,
  refresh: ChronoDuration,
  not_found_refresh: ChronoDuration,
  max_age: ChronoDuration,
  shutdown: CancellationToken,
) {
  loop {
    match store.fetch_applications_needing_update(refresh, not_found_refresh).await {
      Ok(applications) => {
        for application in applications {
          let message = JobMessage {
            chat_id: application.user_id,
            number: application.key.number.clone(),
            suffix: application.key.suffix.clone(),
            application_type: application.key.application_type.clone(),
            year: application.key.year,
            request_type: RequestType::Refresh,
            force_refresh: false,
            failed: false,
            is_reminder: None,
            last_updated: application.last_updated.to_rfc3339(),
            application_id: Some(application.id.0),
          };
          if let Err(error) = broker.publish_refresh(message).await {
            error!(%error, "failed to publish refresh job");
          }
        }
      }
      Err(error) => error!(%error, "failed to fetch applications needing update"),
    }

    match store.fetch_applications_to_expire(max_age).await {
      Ok(applications) => {
        for application in applications {
          let message = JobMessage {
            chat_id: application.user_id,
            number: application.key.number.clone(),
            suffix: application.key.suffix.clone(),
            application_type: application.key.application_type.clone(),
            year: application.key.year,
            request_type: RequestType::Expire,
            force_refresh: false,
            failed: false,
            is_reminder: None,
            last_updated: application.last_updated.to_rfc3339(),
            application_id: Some(application.id.0),
          };
          if let Err(error) = broker.publish_expiration(message).await {
            error!(%error, "failed to publish expiration job");
          }
        }
      }
      Err(error) => error!(%error, "failed to fetch applications to expire"),
    }

    if !sleep_or_cancel(period, &shutdown).await {
      info!("application monitor shutting down");
      return;
    }
  }
}

/// §4.4 ReminderMonitor: fixed 60s period, wall-clock-aware.
pub async fn reminder_monitor<S: Store, B: Broker>(store: Arc<S>, broker: Arc<B>, timezone: Tz, shutdown: CancellationToken) {
  loop {
    let now_local = Utc::now().with_timezone(&timezone);
    let (hour, minute) = (now_local.format("%H").to_string(), now_local.format("%M").to_string());
    let hour: u32 = hour.parse().unwrap_or(0);
    let minute: u32 = minute.parse().unwrap_or(0);

    match store.fetch_due_reminders(hour, minute).await {
      Ok(reminders) => {
        for reminder in reminders {
          let message = JobMessage {
            chat_id: reminder.user_id,
            number: reminder.application_key.number.clone(),
            suffix: reminder.application_key.suffix.clone(),
            application_type: reminder.application_key.application_type.clone(),
            year: reminder.application_key.year,
            request_type: RequestType::Fetch,
            force_refresh: true,
            failed: false,
            is_reminder: Some(true),
            last_updated: "0".to_string(),
            application_id: None,
          };
          if let Err(error) = broker.publish_fetch(message).await {
            error!(%error, "failed to publish reminder fetch job");
          }
        }
      }
      Err(error) => error!(%error, "failed to fetch due reminders"),
    }

    if !sleep_or_cancel(Duration::from_secs(60), &shutdown).await {
      info!("reminder monitor shutting down");
      return;
    }
  }
}
