//! [`HttpBrowserEngine`]: fetches the portal page over plain HTTP via
//! `reqwest`, grounded on the teacher's `reqwest` dependency in
//! `bot_server/Cargo.toml`. The original collaborator drove a headless
//! Selenium browser (`fetcher/browser.py`) to defeat the portal's
//! JavaScript rendering; no headless-browser crate sits in the teacher's
//! dependency stack, so this engine targets the portal's underlying HTML
//! response directly, which is what every caller (§4.3 steps 3-4) actually
//! inspects.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracker_core::contracts::BrowserEngine;
use tracker_core::domain::ApplicationKey;
use tracker_core::error::TransportError;

pub struct HttpBrowserEngine {
  http: reqwest::Client,
}

impl HttpBrowserEngine {
  pub fn new(page_load_timeout: Duration) -> Self {
    let http = reqwest::Client::builder()
      .timeout(page_load_timeout)
      .user_agent("Mozilla/5.0 (compatible; ApplicationStatusTracker/1.0)")
      .build()
      .expect("reqwest client configuration is valid");
    Self { http }
  }
}

#[async_trait]
impl BrowserEngine for HttpBrowserEngine {
  async fn fetch(&self, url: &str, _key: &ApplicationKey) -> Result<String, TransportError> {
    let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
    response.text().await.map_err(map_reqwest_error)
  }

  async fn probe_latency(&self, url: &str) -> Result<Duration, TransportError> {
    let start = Instant::now();
    self.http.head(url).send().await.map_err(map_reqwest_error)?;
    Ok(start.elapsed())
  }

  async fn close(&self) -> Result<(), TransportError> {
    Ok(())
  }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
  if error.is_timeout() {
    TransportError::TimedOut(error.to_string())
  } else {
    TransportError::Network(error.to_string())
  }
}

#[cfg(test)]
pub mod mock {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  /// Replays a fixed script of responses, grounded on the teacher's use of
  /// `mockall`-free hand-rolled test doubles where trait objects are
  /// simpler to script directly.
  pub struct ScriptedBrowserEngine {
    responses: Vec<Result<String, TransportError>>,
    cursor: AtomicUsize,
    pub closed: Mutex<bool>,
  }

  impl ScriptedBrowserEngine {
    pub fn new(responses: Vec<Result<String, TransportError>>) -> Self {
      Self {
        responses,
        cursor: AtomicUsize::new(0),
        closed: Mutex::new(false),
      }
    }
  }

  #[async_trait]
  impl BrowserEngine for ScriptedBrowserEngine {
    async fn fetch(&self, _url: &str, _key: &ApplicationKey) -> Result<String, TransportError> {
      let index = self.cursor.fetch_add(1, Ordering::SeqCst);
      self
        .responses
        .get(index)
        .cloned()
        .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }

    async fn probe_latency(&self, _url: &str) -> Result<Duration, TransportError> {
      Ok(Duration::from_millis(10))
    }

    async fn close(&self) -> Result<(), TransportError> {
      *self.closed.lock().unwrap() = true;
      Ok(())
    }
  }
}
