use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MIN_ELASTICITY_RECORDS;
use crate::errors::AppError;
use crate::models::{AnalysisContext, ElasticityRow, ElasticitySummary, GroupKey};
use crate::routes::{csv_attachment, run_blocking};
use crate::services::analysis_cache::{AnalysisKind, CacheKey};
use crate::services::{elasticity_service, export_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_elasticity))
        .route("/export", get(export_elasticity))
}

#[derive(Debug, Deserialize)]
pub struct ElasticityQuery {
    pub store: Option<String>,
    pub segment: Option<String>,
    pub min_records: Option<usize>,
    pub group_by: Option<GroupKey>,
}

#[derive(Debug, Serialize)]
pub struct RecommendedRow {
    #[serde(flatten)]
    pub row: ElasticityRow,
    pub recommendation: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ElasticityResponse {
    pub context: AnalysisContext,
    pub min_records: usize,
    pub summary: ElasticitySummary,
    pub rows: Vec<RecommendedRow>,
}

async fn estimated_rows(
    state: &AppState,
    params: ElasticityQuery,
) -> Result<(AnalysisContext, usize, Arc<Vec<ElasticityRow>>), AppError> {
    let min_records = params.min_records.unwrap_or(MIN_ELASTICITY_RECORDS);
    if min_records < 2 {
        return Err(AppError::Validation(format!(
            "min_records must be at least 2, got {}",
            min_records
        )));
    }

    let group_key = params.group_by.unwrap_or_default();
    let context = AnalysisContext::new(params.store, params.segment);
    info!("Estimating elasticity for {} (min {} records)", context.label(), min_records);

    let snapshot = state.store.snapshot();
    let key = CacheKey {
        fingerprint: snapshot.fingerprint,
        context: context.clone(),
        kind: AnalysisKind::Elasticity { min_records, group_key },
    };
    let cache = state.cache().clone();
    let scope = context.clone();

    let rows = run_blocking(move || {
        cache.get_or_compute(key, || {
            elasticity_service::run_estimate(&snapshot.records, &scope, min_records, group_key)
        })
    })
    .await?;

    Ok((context, min_records, rows))
}

async fn get_elasticity(
    State(state): State<AppState>,
    Query(params): Query<ElasticityQuery>,
) -> Result<Json<ElasticityResponse>, AppError> {
    let (context, min_records, rows) = estimated_rows(&state, params).await?;

    Ok(Json(ElasticityResponse {
        context,
        min_records,
        summary: elasticity_service::summarize(&rows),
        rows: rows
            .iter()
            .map(|row| RecommendedRow {
                recommendation: row.classification.recommendation(),
                row: row.clone(),
            })
            .collect(),
    }))
}

async fn export_elasticity(
    State(state): State<AppState>,
    Query(params): Query<ElasticityQuery>,
) -> Result<Response, AppError> {
    let (_, _, rows) = estimated_rows(&state, params).await?;
    let body = export_service::rows_to_csv(&rows)
        .map_err(|e| AppError::Internal(format!("{:#}", e)))?;

    Ok(csv_attachment("price_elasticity.csv", body))
}
