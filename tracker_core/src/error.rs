use thiserror::Error;

/// Domain-level error taxonomy shared by every service, mirroring the split
/// the teacher draws between `CoreError` (business) and `PublishError`
/// (transport, with an `is_retryable` classification).
#[derive(Error, Debug, Clone)]
pub enum CoreError {
  #[error("database error: {0}")]
  Database(String),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("internal error: {0}")]
  Internal(String),
}

/// Transport-facing error taxonomy: broker, store I/O, chat-platform I/O,
/// browser-engine fetches. `is_retryable` is a property of the error, not of
/// the call site, per the spec's design note on exceptions-as-control-flow.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
  #[error("network error: {0}")]
  Network(String),

  #[error("timed out: {0}")]
  TimedOut(String),

  #[error("rate limited, retry after {retry_after_secs:?}s: {0}", retry_after_secs = .1)]
  RetryAfter(String, Option<u64>),

  #[error("serialization error: {0}")]
  Serialize(String),

  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("authentication error: {0}")]
  Authentication(String),

  #[error("broker unavailable: {0}")]
  BrokerUnavailable(String),
}

impl TransportError {
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      TransportError::Network(_) | TransportError::TimedOut(_) | TransportError::RetryAfter(_, _)
    )
  }

  /// Retry-After delay the remote side asked for, if any (§4.6).
  pub fn retry_after_secs(&self) -> Option<u64> {
    match self {
      TransportError::RetryAfter(_, secs) => *secs,
      _ => None,
    }
  }
}

/// Converts a lower-level error into a service's local error type. Mirrors
/// the teacher's `ErrorMapper` trait used at crate boundaries.
pub trait ErrorMapper {
  type Error;
  fn map_error(error: CoreError) -> Self::Error;
}
