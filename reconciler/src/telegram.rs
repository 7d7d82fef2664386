//! [`TelegramChatSink`]: sends a message via the Telegram Bot HTTP API.
//! Grounded on the teacher's `reqwest` usage in `bot_server` (a JSON REST
//! client, no bot framework dependency); the original bot used `aiogram`
//! (`bot/telegram_bot.py`), which this replaces with a direct HTTP call
//! since no Rust Telegram framework is in the teacher's dependency stack.

use async_trait::async_trait;
use serde_json::json;
use tracker_core::contracts::ChatSink;
use tracker_core::error::TransportError;
use tracker_core::ids::UserId;

pub struct TelegramChatSink {
  http: reqwest::Client,
  base_url: String,
}

impl TelegramChatSink {
  pub fn new(bot_token: &str) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: format!("https://api.telegram.org/bot{bot_token}"),
    }
  }
}

#[async_trait]
impl ChatSink for TelegramChatSink {
  async fn send(&self, chat_id: UserId, text: &str) -> Result<(), TransportError> {
    let response = self
      .http
      .post(format!("{}/sendMessage", self.base_url))
      .json(&json!({ "chat_id": chat_id.0, "text": text }))
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          TransportError::TimedOut(e.to_string())
        } else {
          TransportError::Network(e.to_string())
        }
      })?;

    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
      let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
      return Err(TransportError::RetryAfter(
        "Telegram rate limit".to_string(),
        retry_after,
      ));
    }

    if response.status() == reqwest::StatusCode::FORBIDDEN {
      return Err(TransportError::Authentication(
        "bot was blocked by the user".to_string(),
      ));
    }

    if !response.status().is_success() {
      return Err(TransportError::Network(format!(
        "telegram API returned {}",
        response.status()
      )));
    }

    Ok(())
  }
}
