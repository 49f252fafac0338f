use chrono::{Datelike, NaiveDate};

use super::additive_model::{
    AdditiveModel, FittedModel, ModelError, ModelSettings, Prediction, SeasonalityMode,
};
use crate::models::DailySeries;

/// Baseline forecaster: least-squares linear trend with weekly and monthly
/// seasonal indices and a residual-based uncertainty band.
///
/// Honors the seasonality mode and the weekly/yearly switches of
/// `ModelSettings`. Monthly indices need at least a year of history. The
/// prior scales are specific to changepoint models and are not used here.
#[derive(Debug, Clone, Default)]
pub struct SeasonalTrendModel;

impl SeasonalTrendModel {
    pub fn new() -> Self {
        Self
    }
}

const DAYS_PER_YEAR: f64 = 365.0;
const MIN_BASE: f64 = 1e-9;

impl AdditiveModel for SeasonalTrendModel {
    fn name(&self) -> &str {
        "seasonal_trend"
    }

    fn fit(
        &self,
        series: &DailySeries,
        settings: &ModelSettings,
    ) -> Result<Box<dyn FittedModel>, ModelError> {
        let (origin, last) = match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ModelError::EmptySeries),
        };

        if series.len() < 2 {
            return Err(ModelError::InsufficientHistory(format!(
                "need at least 2 days, got {}",
                series.len()
            )));
        }

        let values = series.values();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Fit("series contains non-finite values".to_string()));
        }

        let dates = series.dates();
        let xs: Vec<f64> = dates
            .iter()
            .map(|d| (*d - origin).num_days() as f64)
            .collect();

        let (slope, intercept) = linear_fit(&xs, &values);
        let trend: Vec<f64> = xs.iter().map(|x| intercept + slope * x).collect();
        let mode = settings.seasonality_mode;

        let weekly = if settings.weekly_seasonality {
            seasonal_index(&dates, &values, &trend, mode, 7, weekday_bucket)
        } else {
            neutral_index(mode, 7)
        };

        let span_days = (last - origin).num_days() as f64;
        let with_weekly: Vec<f64> = dates
            .iter()
            .zip(&trend)
            .map(|(d, t)| combine(mode, *t, weekly[weekday_bucket(d)], neutral(mode)))
            .collect();

        let monthly = if settings.yearly_seasonality && span_days >= DAYS_PER_YEAR {
            seasonal_index(&dates, &values, &with_weekly, mode, 12, month_bucket)
        } else {
            neutral_index(mode, 12)
        };

        let fitted: Vec<f64> = dates
            .iter()
            .zip(&trend)
            .map(|(d, t)| combine(mode, *t, weekly[weekday_bucket(d)], monthly[month_bucket(d)]))
            .collect();

        let sse: f64 = values
            .iter()
            .zip(&fitted)
            .map(|(y, f)| (y - f).powi(2))
            .sum();
        let dof = values.len().saturating_sub(2).max(1) as f64;
        let sigma = (sse / dof).sqrt();

        Ok(Box::new(FittedSeasonalTrend {
            origin,
            last,
            span_days: span_days.max(1.0),
            slope,
            intercept,
            weekly,
            monthly,
            mode,
            sigma,
            z: z_score(settings.interval_width),
        }))
    }
}

#[derive(Debug, Clone)]
struct FittedSeasonalTrend {
    origin: NaiveDate,
    last: NaiveDate,
    span_days: f64,
    slope: f64,
    intercept: f64,
    weekly: Vec<f64>,
    monthly: Vec<f64>,
    mode: SeasonalityMode,
    sigma: f64,
    z: f64,
}

impl FittedModel for FittedSeasonalTrend {
    fn last_training_date(&self) -> NaiveDate {
        self.last
    }

    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<Prediction>, ModelError> {
        dates
            .iter()
            .map(|date| {
                let x = (*date - self.origin).num_days() as f64;
                let trend = self.intercept + self.slope * x;
                let yhat = combine(
                    self.mode,
                    trend,
                    self.weekly[weekday_bucket(date)],
                    self.monthly[month_bucket(date)],
                );

                // Band widens with distance past the training window
                let ahead = (*date - self.last).num_days().max(0) as f64;
                let half_width = self.z * self.sigma * (1.0 + ahead / self.span_days).sqrt();

                if !yhat.is_finite() || !half_width.is_finite() {
                    return Err(ModelError::Predict(format!("non-finite prediction for {}", date)));
                }

                Ok(Prediction {
                    date: *date,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                })
            })
            .collect()
    }
}

fn weekday_bucket(date: &NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

fn month_bucket(date: &NaiveDate) -> usize {
    date.month0() as usize
}

fn neutral(mode: SeasonalityMode) -> f64 {
    match mode {
        SeasonalityMode::Multiplicative => 1.0,
        SeasonalityMode::Additive => 0.0,
    }
}

fn neutral_index(mode: SeasonalityMode, buckets: usize) -> Vec<f64> {
    vec![neutral(mode); buckets]
}

fn combine(mode: SeasonalityMode, trend: f64, weekly: f64, monthly: f64) -> f64 {
    match mode {
        SeasonalityMode::Multiplicative => trend * weekly * monthly,
        SeasonalityMode::Additive => trend + weekly + monthly,
    }
}

/// Least squares `y = slope * x + intercept`
fn linear_fit(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let (numerator, denominator) = xs.iter().zip(ys).fold((0.0, 0.0), |(num, den), (x, y)| {
        (num + (x - x_mean) * (y - y_mean), den + (x - x_mean).powi(2))
    });

    if denominator == 0.0 {
        return (0.0, y_mean);
    }

    let slope = numerator / denominator;
    (slope, y_mean - slope * x_mean)
}

/// Mean ratio (multiplicative) or mean difference (additive) of the values
/// against `base`, per bucket. Empty buckets stay neutral; populated buckets
/// are normalized to average out to neutral.
fn seasonal_index(
    dates: &[NaiveDate],
    values: &[f64],
    base: &[f64],
    mode: SeasonalityMode,
    buckets: usize,
    bucket_of: fn(&NaiveDate) -> usize,
) -> Vec<f64> {
    let mut sums = vec![0.0; buckets];
    let mut counts = vec![0usize; buckets];

    for ((date, y), b) in dates.iter().zip(values).zip(base) {
        let effect = match mode {
            SeasonalityMode::Multiplicative => {
                if *b <= MIN_BASE {
                    continue;
                }
                y / b
            }
            SeasonalityMode::Additive => y - b,
        };
        let bucket = bucket_of(date);
        sums[bucket] += effect;
        counts[bucket] += 1;
    }

    let populated: Vec<usize> = (0..buckets).filter(|&i| counts[i] > 0).collect();
    if populated.is_empty() {
        return neutral_index(mode, buckets);
    }

    let mut index: Vec<f64> = (0..buckets)
        .map(|i| {
            if counts[i] > 0 {
                sums[i] / counts[i] as f64
            } else {
                neutral(mode)
            }
        })
        .collect();

    let level = populated.iter().map(|&i| index[i]).sum::<f64>() / populated.len() as f64;
    for &i in &populated {
        match mode {
            SeasonalityMode::Multiplicative => {
                if level > MIN_BASE {
                    index[i] /= level;
                }
            }
            SeasonalityMode::Additive => index[i] -= level,
        }
    }

    index
}

fn z_score(interval_width: f64) -> f64 {
    match interval_width {
        w if w >= 0.99 => 2.576,
        w if w >= 0.95 => 1.96,
        w if w >= 0.90 => 1.645,
        w if w >= 0.80 => 1.2816,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series_from(start: NaiveDate, values: &[f64]) -> DailySeries {
        DailySeries::from_pairs(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + Duration::days(i as i64), *v)),
        )
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_fit_rejects_empty_series() {
        let result = SeasonalTrendModel::new().fit(&DailySeries::default(), &ModelSettings::default());
        assert!(matches!(result, Err(ModelError::EmptySeries)));
    }

    #[test]
    fn test_linear_series_is_extrapolated() {
        let values: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        let settings = ModelSettings {
            weekly_seasonality: false,
            yearly_seasonality: false,
            ..ModelSettings::default()
        };

        let fitted = SeasonalTrendModel::new()
            .fit(&series_from(monday(), &values), &settings)
            .unwrap();
        let future = fitted.forecast(5).unwrap();

        assert_eq!(future.len(), 5);
        assert_eq!(future[0].date, monday() + Duration::days(30));
        assert!((future[0].yhat - 160.0).abs() < 1e-6);
        assert!((future[4].yhat - 168.0).abs() < 1e-6);
    }

    #[test]
    fn test_weekly_pattern_is_captured() {
        let pattern = [10.0, 10.0, 10.0, 10.0, 10.0, 25.0, 25.0];
        let values: Vec<f64> = (0..56).map(|i| pattern[i % 7]).collect();

        let fitted = SeasonalTrendModel::new()
            .fit(&series_from(monday(), &values), &ModelSettings::default())
            .unwrap();
        let future = fitted.forecast(7).unwrap();

        // 56 days from a Monday: the forecast starts on a Monday
        let weekday = future[2].yhat;
        let saturday = future[5].yhat;
        assert!(saturday > weekday * 1.8, "saturday {} weekday {}", saturday, weekday);
    }

    #[test]
    fn test_bands_bracket_and_widen() {
        let values: Vec<f64> = (0..40)
            .map(|i| 50.0 + if i % 3 == 0 { 6.0 } else { -3.0 })
            .collect();

        let fitted = SeasonalTrendModel::new()
            .fit(&series_from(monday(), &values), &ModelSettings::default())
            .unwrap();
        let future = fitted.forecast(30).unwrap();

        for p in &future {
            assert!(p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper);
        }
        let first_width = future[0].yhat_upper - future[0].yhat_lower;
        let last_width = future[29].yhat_upper - future[29].yhat_lower;
        assert!(last_width > first_width);
    }
}
