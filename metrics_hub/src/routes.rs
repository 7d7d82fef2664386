//! `GET /metrics/fetchers` and `GET /metrics/fetchers/:id`, the operator
//! view named in §2's component table.

use axum::{
  extract::{Path, State},
  response::Json,
  routing::get,
  Router,
};
use std::sync::Arc;
use tracker_core::ids::FetcherId;

use crate::error::MetricsHubError;
use crate::store::{FetcherMetricsView, MetricsStore};

async fn get_all_fetchers(State(store): State<Arc<MetricsStore>>) -> Json<Vec<FetcherMetricsView>> {
  Json(store.get_all())
}

async fn get_fetcher(
  State(store): State<Arc<MetricsStore>>,
  Path(id): Path<String>,
) -> Result<Json<FetcherMetricsView>, MetricsHubError> {
  store
    .get(&FetcherId(id.clone()))
    .map(Json)
    .ok_or_else(|| MetricsHubError::NotFound(format!("no metrics for fetcher {id}")))
}

pub fn router(store: Arc<MetricsStore>) -> Router {
  Router::new()
    .route("/metrics/fetchers", get(get_all_fetchers))
    .route("/metrics/fetchers/{id}", get(get_fetcher))
    .with_state(store)
}
