pub mod additive_model;
pub mod seasonal_trend;
