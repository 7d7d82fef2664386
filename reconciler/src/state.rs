//! Shared application state, mirroring the shared-read-only-after-construction
//! composition the spec mandates for the Reconciler: `{Store, ChatSink,
//! Fabric}` (§5 Cyclic/shared ownership). Grounded on the `AppState`/
//! `AppStateInner` + `Deref` wrapper in
//! `notify_server::state::app_state::AppState`.

use fabric::{DedupCache, NatsBroker};
use std::ops::Deref;
use std::sync::Arc;
use tracker_core::contracts::ChatSink;
use tracker_core::PgStore;

#[derive(Clone)]
pub struct AppState {
  inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
  pub store: Arc<PgStore>,
  pub broker: Arc<NatsBroker>,
  pub dedup: Arc<DedupCache>,
  pub chat_sink: Arc<dyn ChatSink>,
}

impl Deref for AppState {
  type Target = AppStateInner;

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl AppState {
  pub fn new(store: Arc<PgStore>, broker: Arc<NatsBroker>, dedup: Arc<DedupCache>, chat_sink: Arc<dyn ChatSink>) -> Self {
    Self {
      inner: Arc::new(AppStateInner {
        store,
        broker,
        dedup,
        chat_sink,
      }),
    }
  }
}
