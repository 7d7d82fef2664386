use axum::{extract::State, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::store::MetricsStore;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
  pub status: String,
  pub service: String,
  pub timestamp: DateTime<Utc>,
  pub tracked_fetchers: usize,
}

async fn health_check(State(store): State<Arc<MetricsStore>>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "healthy".to_string(),
    service: "metrics_hub".to_string(),
    timestamp: Utc::now(),
    tracked_fetchers: store.len(),
  })
}

pub fn router(store: Arc<MetricsStore>) -> Router {
  Router::new().route("/health", get(health_check)).with_state(store)
}
