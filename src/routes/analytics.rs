use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::{AnalysisContext, SalesOverview};
use crate::routes::run_blocking;
use crate::services::analysis_cache::{AnalysisKind, CacheKey};
use crate::services::analytics_service;
use crate::state::AppState;

const DEFAULT_TOP: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_overview))
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    pub store: Option<String>,
    pub segment: Option<String>,
    pub top: Option<usize>,
}

async fn get_overview(
    State(state): State<AppState>,
    Query(params): Query<OverviewQuery>,
) -> Result<Json<SalesOverview>, AppError> {
    let top = params.top.unwrap_or(DEFAULT_TOP).clamp(1, 100);
    let context = AnalysisContext::new(params.store, params.segment);
    info!("GET /api/analytics - {} (top {})", context.label(), top);

    let snapshot = state.store.snapshot();
    let key = CacheKey {
        fingerprint: snapshot.fingerprint,
        context: context.clone(),
        kind: AnalysisKind::Overview { top },
    };
    let cache = state.cache().clone();

    let overview = run_blocking(move || {
        cache.get_or_compute(key, || {
            Ok(analytics_service::overview(&context.apply(&snapshot.records), top))
        })
    })
    .await?;

    Ok(Json(overview.as_ref().clone()))
}
