use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::DailySeries;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("training series is empty")]
    EmptySeries,

    #[error("insufficient history: {0}")]
    InsufficientHistory(String),

    #[error("fit failed: {0}")]
    Fit(String),

    #[error("prediction failed: {0}")]
    Predict(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    Additive,
    Multiplicative,
}

/// Configuration handed to the forecasting capability on every fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub seasonality_mode: SeasonalityMode,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    pub daily_seasonality: bool,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    /// Coverage of the lower/upper band
    pub interval_width: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            seasonality_mode: SeasonalityMode::Multiplicative,
            weekly_seasonality: true,
            yearly_seasonality: true,
            daily_seasonality: false,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            interval_width: 0.95,
        }
    }
}

/// Point estimate with its uncertainty band for one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// Additive trend + seasonality forecaster consumed as a black box.
///
/// Implementations must be usable from several requests at once; a fit
/// produces an independent handle and never mutates the model itself.
pub trait AdditiveModel: Send + Sync {
    fn name(&self) -> &str;

    fn fit(
        &self,
        series: &DailySeries,
        settings: &ModelSettings,
    ) -> Result<Box<dyn FittedModel>, ModelError>;
}

/// Handle to a fitted model
pub trait FittedModel: Send + Sync {
    /// Last date of the training series
    fn last_training_date(&self) -> NaiveDate;

    /// Predictions for arbitrary dates, in the order given
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<Prediction>, ModelError>;

    /// Predictions for the `horizon` days following the training series
    fn forecast(&self, horizon: usize) -> Result<Vec<Prediction>, ModelError> {
        let last = self.last_training_date();
        let dates: Vec<NaiveDate> = (1..=horizon as i64)
            .map(|day| last + Duration::days(day))
            .collect();
        self.predict(&dates)
    }
}
