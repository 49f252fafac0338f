use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::config::{AnalysisOptions, SmoothingMethod};
use crate::errors::AppError;
use crate::models::{AnalysisContext, ForecastReport};
use crate::routes::run_blocking;
use crate::services::analysis_cache::{AnalysisKind, CacheKey};
use crate::services::forecasting_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_forecast))
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub store: Option<String>,
    pub segment: Option<String>,
    pub days: Option<u32>,
    pub remove_outliers: Option<bool>,
    pub smoothing_method: Option<String>,
    pub smoothing_window: Option<usize>,
}

impl ForecastQuery {
    fn options(&self) -> Result<AnalysisOptions, AppError> {
        let defaults = AnalysisOptions::default();
        let smoothing_method = match self.smoothing_method.as_deref() {
            Some(method) => method.parse::<SmoothingMethod>()?,
            None => defaults.smoothing_method,
        };

        let options = AnalysisOptions {
            remove_outliers: self.remove_outliers.unwrap_or(defaults.remove_outliers),
            smoothing_method,
            smoothing_window: self.smoothing_window.unwrap_or(defaults.smoothing_window),
            forecast_days: self.days.unwrap_or(defaults.forecast_days),
        };
        options.validate()?;
        Ok(options)
    }
}

async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<ForecastReport>, AppError> {
    let options = params.options()?;
    let context = AnalysisContext::new(params.store, params.segment);
    info!("GET /api/forecast - {} ({} days)", context.label(), options.forecast_days);

    let snapshot = state.store.snapshot();
    let key = CacheKey {
        fingerprint: snapshot.fingerprint,
        context: context.clone(),
        kind: AnalysisKind::Forecast(options.clone()),
    };

    let cache = state.cache().clone();
    let model = state.model.clone();
    let settings = state.model_settings.clone();

    let report = run_blocking(move || {
        cache.get_or_compute(key, || {
            forecasting_service::run_forecast(
                &snapshot.records,
                &context,
                &options,
                model.as_ref(),
                &settings,
            )
        })
    })
    .await?;

    Ok(Json(report.as_ref().clone()))
}
