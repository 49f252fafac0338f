use chrono::Utc;
use tracing::{info, warn};

use crate::config::{AnalysisOptions, MIN_FORECAST_RECORDS};
use crate::errors::AppError;
use crate::external::additive_model::{AdditiveModel, FittedModel, ModelSettings};
use crate::models::{
    AccuracyMetrics, AnalysisContext, DailySeries, ForecastReport, ForecastResult,
    ForecastStatistics, SalesRecord,
};
use crate::services::preprocessing_service::{prepare_series, series_stats};

/// Fits the injected model on `series` and forecasts `horizon_days` past its
/// last date.
///
/// Forecast values and bounds are clipped to >= 0 and the bounds are widened
/// where needed so that they always bracket the point estimate. Accuracy is
/// replayed over the training dates only; a failed replay leaves
/// `accuracy` empty rather than failing the forecast.
pub fn forecast(
    series: &DailySeries,
    horizon_days: u32,
    model: &dyn AdditiveModel,
    settings: &ModelSettings,
) -> Result<ForecastResult, AppError> {
    if series.is_empty() {
        return Err(AppError::ModelFit("cannot fit a model on an empty series".to_string()));
    }

    info!(
        "Fitting {} on {} days ({} days ahead)",
        model.name(),
        series.len(),
        horizon_days
    );

    let fitted = model.fit(series, settings)?;
    let predictions = fitted.forecast(horizon_days as usize)?;

    if predictions.len() != horizon_days as usize {
        return Err(AppError::ModelFit(format!(
            "model returned {} predictions for a {}-day horizon",
            predictions.len(),
            horizon_days
        )));
    }

    let mut forecast_dates = Vec::with_capacity(predictions.len());
    let mut point_estimate = Vec::with_capacity(predictions.len());
    let mut lower_bound = Vec::with_capacity(predictions.len());
    let mut upper_bound = Vec::with_capacity(predictions.len());

    for p in &predictions {
        let yhat = p.yhat.max(0.0);
        forecast_dates.push(p.date);
        point_estimate.push(yhat);
        lower_bound.push(p.yhat_lower.max(0.0).min(yhat));
        upper_bound.push(p.yhat_upper.max(0.0).max(yhat));
    }

    let accuracy = match replay_accuracy(series, fitted.as_ref()) {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            warn!("Could not compute accuracy metrics: {}", e);
            None
        }
    };

    Ok(ForecastResult {
        model_name: model.name().to_string(),
        historical_dates: series.dates(),
        historical_values: series.values(),
        forecast_dates,
        point_estimate,
        lower_bound,
        upper_bound,
        accuracy,
    })
}

/// Predicts the training dates with the fitted model and scores the result
pub fn replay_accuracy(
    series: &DailySeries,
    fitted: &dyn FittedModel,
) -> Result<AccuracyMetrics, AppError> {
    let predictions = fitted.predict(&series.dates())?;
    let y_true = series.values();
    let y_pred: Vec<f64> = predictions.iter().map(|p| p.yhat).collect();

    accuracy_metrics(&y_true, &y_pred)
        .ok_or_else(|| AppError::ModelFit("no predictions to score".to_string()))
}

/// MAE, RMSE, MAPE and R² of aligned arrays.
///
/// Arrays are truncated to the shorter length. MAPE only counts non-zero
/// actuals and is 0 when every actual is zero. R² is 1 for a perfect fit of
/// a constant series and 0 for an imperfect one. `None` if nothing remains
/// to compare.
pub fn accuracy_metrics(y_true: &[f64], y_pred: &[f64]) -> Option<AccuracyMetrics> {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return None;
    }

    let y_true = &y_true[..n];
    let y_pred = &y_pred[..n];
    let count = n as f64;

    let mae = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum::<f64>() / count;
    let ss_res = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum::<f64>();
    let rmse = (ss_res / count).sqrt();

    let (ape_sum, non_zero) = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, _)| **t != 0.0)
        .fold((0.0, 0usize), |(sum, k), (t, p)| (sum + ((t - p) / t).abs(), k + 1));
    let mape = if non_zero > 0 {
        ape_sum / non_zero as f64 * 100.0
    } else {
        0.0
    };

    let y_mean = y_true.iter().sum::<f64>() / count;
    let ss_tot = y_true.iter().map(|t| (t - y_mean).powi(2)).sum::<f64>();
    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    };

    Some(AccuracyMetrics { mae, rmse, mape, r2 })
}

/// Average and total forecast demand, and revenue at the historical average
/// unit price (`sum(amount) / sum(quantity)`).
pub fn forecast_statistics(records: &[SalesRecord], result: &ForecastResult) -> ForecastStatistics {
    let total_forecast: f64 = result.point_estimate.iter().sum();
    let avg_daily_forecast = if result.point_estimate.is_empty() {
        0.0
    } else {
        total_forecast / result.point_estimate.len() as f64
    };

    let total_quantity: i64 = records.iter().map(|r| r.quantity).sum();
    let total_amount: f64 = records.iter().map(|r| r.amount_f64()).sum();
    let avg_unit_price = if total_quantity > 0 {
        total_amount / total_quantity as f64
    } else {
        0.0
    };

    ForecastStatistics {
        avg_daily_forecast,
        total_forecast,
        avg_unit_price,
        forecast_revenue: total_forecast * avg_unit_price,
    }
}

/// Filter, preprocess, fit and summarize in one pass for a store/segment
pub fn run_forecast(
    records: &[SalesRecord],
    context: &AnalysisContext,
    options: &AnalysisOptions,
    model: &dyn AdditiveModel,
    settings: &ModelSettings,
) -> Result<ForecastReport, AppError> {
    options.validate()?;

    let filtered = context.apply(records);
    if filtered.len() < MIN_FORECAST_RECORDS {
        return Err(AppError::InsufficientData {
            required: MIN_FORECAST_RECORDS,
            actual: filtered.len(),
        });
    }

    info!(
        "Generating forecast for {} ({} records, {} days ahead)",
        context.label(),
        filtered.len(),
        options.forecast_days
    );

    let prepared = prepare_series(&filtered, options);
    let result = forecast(&prepared.cleaned, options.forecast_days, model, settings)?;
    let statistics = forecast_statistics(&filtered, &result);

    Ok(ForecastReport {
        context: context.clone(),
        records_used: filtered.len(),
        original_stats: series_stats(&prepared.original.values()),
        cleaned_stats: series_stats(&prepared.cleaned.values()),
        scenarios: result.scenarios(),
        forecast: result,
        statistics,
        generated_at: Utc::now(),
    })
}
