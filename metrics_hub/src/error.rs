use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsHubError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("message fabric error: {0}")]
  Fabric(String),

  #[error("configuration error: {0}")]
  Config(String),

  #[error("any error: {0}")]
  Any(#[from] anyhow::Error),
}

impl IntoResponse for MetricsHubError {
  fn into_response(self) -> Response {
    let (status, error_message) = match self {
      MetricsHubError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
      MetricsHubError::Fabric(err) => (StatusCode::SERVICE_UNAVAILABLE, err),
      MetricsHubError::Config(err) => (StatusCode::INTERNAL_SERVER_ERROR, err),
      MetricsHubError::Any(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };

    let body = Json(json!({
        "error": error_message,
        "status": status.as_u16()
    }));

    (status, body).into_response()
  }
}
