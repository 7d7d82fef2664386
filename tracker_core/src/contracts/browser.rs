//! Browser-engine contract (§4.3 step 3, §5.5): `Fetch(url, app) -> (status,
//! error)`. Deliberately narrow — a single capability interface per the
//! spec's redesign note replacing duck-typed automation objects.

use crate::domain::ApplicationKey;
use crate::error::TransportError;
use async_trait::async_trait;

#[async_trait]
pub trait BrowserEngine: Send + Sync {
  /// Fetches the raw status text for `key` from `url`. The returned text is
  /// later passed through the number-consistency guard and
  /// `classify_status` (§4.3 steps 3-4, §4.5) by the caller, not here.
  async fn fetch(&self, url: &str, key: &ApplicationKey) -> Result<String, TransportError>;

  /// Measures round-trip latency to the portal without parsing a result,
  /// used by the periodic latency probe (§4.3 Metrics).
  async fn probe_latency(&self, url: &str) -> Result<std::time::Duration, TransportError>;

  /// Releases any held resources (e.g. a headless browser process). Called
  /// on shutdown (§4.3 Shutdown).
  async fn close(&self) -> Result<(), TransportError>;
}
