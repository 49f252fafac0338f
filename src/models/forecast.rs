use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::AnalysisContext;

/// In-sample accuracy of a fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Percent, computed over non-zero actuals only (0 when all actuals are zero)
    pub mape: f64,
    pub r2: f64,
}

/// Horizon forecast produced by the injected model.
///
/// Historical arrays describe the series the model was fitted on. Forecast
/// arrays cover future dates only and are all clipped to >= 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub model_name: String,
    pub historical_dates: Vec<NaiveDate>,
    pub historical_values: Vec<f64>,
    pub forecast_dates: Vec<NaiveDate>,
    pub point_estimate: Vec<f64>,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
    pub accuracy: Option<AccuracyMetrics>,
}

impl ForecastResult {
    pub fn horizon(&self) -> usize {
        self.forecast_dates.len()
    }

    /// Realistic / optimistic / pessimistic paths aligned to `forecast_dates`
    pub fn scenarios(&self) -> ScenarioSet {
        ScenarioSet {
            realistic: self.point_estimate.clone(),
            optimistic: self.upper_bound.iter().map(|v| v.max(0.0)).collect(),
            pessimistic: self.lower_bound.iter().map(|v| v.max(0.0)).collect(),
        }
    }
}

/// Elementwise `pessimistic <= realistic <= optimistic`, all >= 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub realistic: Vec<f64>,
    pub optimistic: Vec<f64>,
    pub pessimistic: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub std_dev: f64,
    pub volatility_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStatistics {
    pub avg_daily_forecast: f64,
    pub total_forecast: f64,
    pub avg_unit_price: f64,
    pub forecast_revenue: f64,
}

/// Everything the forecast view needs for one context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub context: AnalysisContext,
    pub records_used: usize,
    pub original_stats: SeriesStats,
    pub cleaned_stats: SeriesStats,
    pub forecast: ForecastResult,
    pub scenarios: ScenarioSet,
    pub statistics: ForecastStatistics,
    pub generated_at: DateTime<Utc>,
}
