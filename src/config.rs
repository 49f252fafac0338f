use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Cumulative revenue share limits (percent) for A and B
pub const ABC_THRESHOLDS: (f64, f64) = (80.0, 95.0);
/// Coefficient-of-variation limits (percent) for X and Y
pub const XYZ_THRESHOLDS: (f64, f64) = (10.0, 25.0);
pub const MIN_FORECAST_RECORDS: usize = 10;
pub const MIN_ELASTICITY_RECORDS: usize = 10;

pub const FORECAST_DAYS_RANGE: (u32, u32) = (7, 90);
pub const SMOOTHING_WINDOW_RANGE: (usize, usize) = (3, 21);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmoothingMethod {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "ma", alias = "moving_average")]
    MovingAverage,
    #[serde(rename = "ema", alias = "exponential")]
    Exponential,
    #[serde(rename = "savgol", alias = "savitzky_golay")]
    SavitzkyGolay,
}

impl FromStr for SmoothingMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(SmoothingMethod::None),
            "ma" | "moving_average" => Ok(SmoothingMethod::MovingAverage),
            "ema" | "exponential" => Ok(SmoothingMethod::Exponential),
            "savgol" | "savitzky_golay" => Ok(SmoothingMethod::SavitzkyGolay),
            other => Err(AppError::Validation(format!(
                "Unknown smoothing method '{}'. Must be one of none, ma, ema, savgol",
                other
            ))),
        }
    }
}

/// Per-request preprocessing and horizon options
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub remove_outliers: bool,
    pub smoothing_method: SmoothingMethod,
    pub smoothing_window: usize,
    pub forecast_days: u32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            remove_outliers: true,
            smoothing_method: SmoothingMethod::None,
            smoothing_window: 7,
            forecast_days: 30,
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> Result<(), AppError> {
        let (min_days, max_days) = FORECAST_DAYS_RANGE;
        if !(min_days..=max_days).contains(&self.forecast_days) {
            return Err(AppError::Validation(format!(
                "forecast_days must be between {} and {}, got {}",
                min_days, max_days, self.forecast_days
            )));
        }

        if self.smoothing_method != SmoothingMethod::None {
            let (min_window, max_window) = SMOOTHING_WINDOW_RANGE;
            if !(min_window..=max_window).contains(&self.smoothing_window) {
                return Err(AppError::Validation(format!(
                    "smoothing_window must be between {} and {}, got {}",
                    min_window, max_window, self.smoothing_window
                )));
            }
            if self.smoothing_window % 2 == 0 {
                return Err(AppError::Validation(format!(
                    "smoothing_window must be odd, got {}",
                    self.smoothing_window
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub sales_data_path: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e| format!("Invalid BIND_ADDR: {}", e))?;

        Ok(Self {
            bind_addr,
            sales_data_path: std::env::var("SALES_DATA_PATH").ok().map(PathBuf::from),
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            ),
        })
    }
}
