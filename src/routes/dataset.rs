use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{available_segments, available_stores, DatasetSummary};
use crate::services::analytics_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_dataset))
}

#[derive(Debug, Deserialize)]
pub struct DatasetQuery {
    /// Restricts the segment list to one store
    pub store: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DatasetResponse {
    pub summary: DatasetSummary,
    pub stores: Vec<String>,
    pub segments: Vec<String>,
    pub source: Option<String>,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

async fn get_dataset(
    State(state): State<AppState>,
    Query(params): Query<DatasetQuery>,
) -> Json<DatasetResponse> {
    let snapshot = state.store.snapshot();
    let store = params.store.as_deref().filter(|s| !s.trim().is_empty());

    Json(DatasetResponse {
        summary: analytics_service::dataset_summary(&snapshot.records),
        stores: available_stores(&snapshot.records),
        segments: available_segments(&snapshot.records, store),
        source: snapshot.source.map(|p| p.display().to_string()),
        fingerprint: format!("{:016x}", snapshot.fingerprint),
        loaded_at: snapshot.loaded_at,
    })
}
