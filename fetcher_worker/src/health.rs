use axum::{extract::State, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{MetricsCollector, MetricsSnapshot};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
  pub status: String,
  pub service: String,
  pub timestamp: DateTime<Utc>,
  pub metrics: MetricsSnapshot,
}

async fn health_check(State(metrics): State<Arc<MetricsCollector>>) -> Json<HealthResponse> {
  Json(HealthResponse {
    status: "healthy".to_string(),
    service: "fetcher_worker".to_string(),
    timestamp: Utc::now(),
    metrics: metrics.snapshot(),
  })
}

pub fn router(metrics: Arc<MetricsCollector>) -> Router {
  Router::new().route("/health", get(health_check)).with_state(metrics)
}
