use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::{
    AbcClass, AnalysisContext, ClassificationRow, ClassificationSummary, GroupKey, XyzClass,
};
use crate::routes::{csv_attachment, run_blocking};
use crate::services::analysis_cache::{AnalysisKind, CacheKey};
use crate::services::{abc_xyz_service, export_service};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_classification))
        .route("/export", get(export_classification))
}

#[derive(Debug, Deserialize)]
pub struct ClassificationQuery {
    pub store: Option<String>,
    pub segment: Option<String>,
    pub group_by: Option<GroupKey>,
    /// Comma-separated ABC classes to keep, e.g. `A,B`
    pub abc: Option<String>,
    /// Comma-separated XYZ classes to keep
    pub xyz: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassificationResponse {
    pub context: AnalysisContext,
    pub group_by: GroupKey,
    pub summary: ClassificationSummary,
    pub rows: Vec<ClassificationRow>,
}

fn parse_classes<T>(raw: Option<&str>, parse: fn(&str) -> Option<T>, axis: &str) -> Result<Vec<T>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            parse(s).ok_or_else(|| AppError::Validation(format!("Unknown {} class '{}'", axis, s)))
        })
        .collect()
}

fn parse_abc(s: &str) -> Option<AbcClass> {
    AbcClass::ALL
        .into_iter()
        .find(|c| s.eq_ignore_ascii_case(&c.as_char().to_string()))
}

fn parse_xyz(s: &str) -> Option<XyzClass> {
    XyzClass::ALL
        .into_iter()
        .find(|c| s.eq_ignore_ascii_case(&c.as_char().to_string()))
}

/// Full classification of the context, served from the cache when possible
async fn classified_rows(
    state: &AppState,
    context: AnalysisContext,
    group_by: GroupKey,
) -> Result<std::sync::Arc<Vec<ClassificationRow>>, AppError> {
    let snapshot = state.store.snapshot();
    let key = CacheKey {
        fingerprint: snapshot.fingerprint,
        context: context.clone(),
        kind: AnalysisKind::Classification(group_by),
    };
    let cache = state.cache().clone();

    run_blocking(move || {
        cache.get_or_compute(key, || {
            Ok(abc_xyz_service::classify(&context.apply(&snapshot.records), group_by))
        })
    })
    .await
}

async fn get_classification(
    State(state): State<AppState>,
    Query(params): Query<ClassificationQuery>,
) -> Result<Json<ClassificationResponse>, AppError> {
    let abc = parse_classes(params.abc.as_deref(), parse_abc, "ABC")?;
    let xyz = parse_classes(params.xyz.as_deref(), parse_xyz, "XYZ")?;
    let group_by = params.group_by.unwrap_or_default();
    let context = AnalysisContext::new(params.store, params.segment);
    info!("GET /api/classification - {} (group by {:?})", context.label(), group_by);

    let rows = classified_rows(&state, context.clone(), group_by).await?;

    Ok(Json(ClassificationResponse {
        context,
        group_by,
        summary: abc_xyz_service::summarize(&rows),
        rows: abc_xyz_service::filter_rows(&rows, &abc, &xyz),
    }))
}

async fn export_classification(
    State(state): State<AppState>,
    Query(params): Query<ClassificationQuery>,
) -> Result<Response, AppError> {
    let abc = parse_classes(params.abc.as_deref(), parse_abc, "ABC")?;
    let xyz = parse_classes(params.xyz.as_deref(), parse_xyz, "XYZ")?;
    let group_by = params.group_by.unwrap_or_default();
    let context = AnalysisContext::new(params.store, params.segment);
    info!("GET /api/classification/export - {}", context.label());

    let rows = classified_rows(&state, context, group_by).await?;
    let body = export_service::rows_to_csv(&abc_xyz_service::filter_rows(&rows, &abc, &xyz))
        .map_err(|e| AppError::Internal(format!("{:#}", e)))?;

    Ok(csv_attachment("abc_xyz_analysis.csv", body))
}
