use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
  pub status: String,
  pub service: String,
  pub timestamp: DateTime<Utc>,
  pub dedup_cache_entries: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "healthy".to_string(),
    service: "reconciler".to_string(),
    timestamp: Utc::now(),
    dedup_cache_entries: state.dedup.len(),
  })
}

pub fn router(state: AppState) -> axum::Router {
  axum::Router::new()
    .route("/health", axum::routing::get(health_check))
    .with_state(state)
}
