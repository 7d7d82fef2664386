use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracker_core::{CoreError, ErrorMapper};

#[derive(Error, Debug)]
pub enum ReconcilerError {
  #[error("sqlx error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("database error: {0}")]
  Database(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("validation error: {0}")]
  Validation(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("configuration error: {0}")]
  Config(String),

  #[error("message fabric error: {0}")]
  Fabric(String),

  #[error("chat sink error: {0}")]
  ChatSink(String),

  #[error("any error: {0}")]
  Any(#[from] anyhow::Error),
}

impl IntoResponse for ReconcilerError {
  fn into_response(self) -> Response {
    let (status, error_message) = match self {
      ReconcilerError::Unauthorized(msg) => (StatusCode::FORBIDDEN, msg),
      ReconcilerError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err),
      ReconcilerError::Serialization(err) => (StatusCode::BAD_REQUEST, err.to_string()),
      ReconcilerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
      ReconcilerError::Config(err) => (StatusCode::INTERNAL_SERVER_ERROR, err),
      ReconcilerError::Fabric(err) => (StatusCode::SERVICE_UNAVAILABLE, err),
      ReconcilerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
      _ => (
        StatusCode::INTERNAL_SERVER_ERROR,
        "unhandled error type".to_string(),
      ),
    };

    let body = Json(json!({
        "error": error_message,
        "status": status.as_u16()
    }));

    (status, body).into_response()
  }
}

impl ErrorMapper for ReconcilerError {
  type Error = ReconcilerError;

  fn map_error(error: CoreError) -> Self::Error {
    match error {
      CoreError::Database(e) => ReconcilerError::Database(e),
      CoreError::Validation(msg) => ReconcilerError::Validation(msg),
      CoreError::NotFound(msg) => ReconcilerError::NotFound(msg),
      CoreError::Conflict(msg) => ReconcilerError::Conflict(msg),
      CoreError::Unauthorized(msg) => ReconcilerError::Unauthorized(msg),
      CoreError::Internal(e) => ReconcilerError::Internal(e),
    }
  }
}
