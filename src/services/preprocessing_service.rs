use tracing::{debug, warn};

use crate::config::{AnalysisOptions, SmoothingMethod};
use crate::models::{DailySeries, SalesRecord, SeriesStats};
use crate::services::savitzky_golay::savgol_filter;
use crate::services::statistics::{mean, quantile_sorted, sample_std_dev, sorted_copy};

/// Tukey fence multiplier
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Daily series before and after cleaning
#[derive(Debug, Clone)]
pub struct PreparedSeries {
    pub original: DailySeries,
    pub cleaned: DailySeries,
}

/// Sums quantity per calendar date
pub fn build_daily_series(records: &[SalesRecord]) -> DailySeries {
    DailySeries::from_pairs(records.iter().map(|r| (r.date, r.quantity as f64)))
}

/// Clips values into `[Q1 - k·IQR, Q3 + k·IQR]`.
///
/// Fewer than 4 values cannot support quartile estimates and are returned
/// unchanged.
pub fn remove_outliers_iqr(values: &[f64], multiplier: f64) -> Vec<f64> {
    if values.len() < 4 {
        return values.to_vec();
    }

    let sorted = sorted_copy(values);
    let (Some(q1), Some(q3)) = (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
    else {
        return values.to_vec();
    };

    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    values.iter().map(|v| v.clamp(lower, upper)).collect()
}

/// Centered rolling mean. Windows at the edges average whatever points
/// exist instead of producing gaps.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window <= 1 || n == 0 {
        return values.to_vec();
    }

    // Centered rolling window with min_periods = 1; even windows reach one
    // more point back than forward
    let ahead = (window - 1) / 2;
    (0..n)
        .map(|i| {
            let end = (i + ahead).min(n - 1);
            let start = (i + ahead + 1).saturating_sub(window);
            let slice = &values[start..=end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Recursive exponentially weighted mean with `alpha = 2 / (span + 1)`,
/// seeded with the first value.
pub fn exponential_smoothing(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return values.to_vec();
    }

    let alpha = 2.0 / (span as f64 + 1.0);

    values
        .iter()
        .scan(None::<f64>, move |prev, &v| {
            let next = match *prev {
                Some(p) => alpha * v + (1.0 - alpha) * p,
                None => v,
            };
            *prev = Some(next);
            Some(next)
        })
        .collect()
}

/// Savitzky-Golay with degree `min(3, window - 1)`; even windows grow by one.
/// Falls back to the moving average when the filter cannot run.
pub fn savitzky_golay(values: &[f64], window: usize) -> Vec<f64> {
    let window = if window % 2 == 0 { window + 1 } else { window };
    let degree = 3.min(window.saturating_sub(1));

    match savgol_filter(values, window, degree) {
        Some(smoothed) => smoothed,
        None => {
            debug!(
                "Savitzky-Golay not applicable (window {}, {} points), using moving average",
                window,
                values.len()
            );
            moving_average(values, window)
        }
    }
}

pub fn smooth(values: &[f64], method: SmoothingMethod, window: usize) -> Vec<f64> {
    match method {
        SmoothingMethod::None => values.to_vec(),
        SmoothingMethod::MovingAverage => moving_average(values, window),
        SmoothingMethod::Exponential => exponential_smoothing(values, window),
        SmoothingMethod::SavitzkyGolay => savitzky_golay(values, window),
    }
}

/// Outlier clipping, smoothing, then a floor at zero. Dates are untouched.
pub fn clean(
    series: &DailySeries,
    remove_outliers: bool,
    smoothing: SmoothingMethod,
    window: usize,
) -> DailySeries {
    let mut values = series.values();

    if remove_outliers {
        values = remove_outliers_iqr(&values, IQR_MULTIPLIER);
    }

    values = smooth(&values, smoothing, window);

    // Negative demand has no physical meaning
    let values: Vec<f64> = values.into_iter().map(|v| v.max(0.0)).collect();

    series.with_values(&values)
}

pub fn prepare_series(records: &[SalesRecord], options: &AnalysisOptions) -> PreparedSeries {
    let original = build_daily_series(records);
    let cleaned = clean(
        &original,
        options.remove_outliers,
        options.smoothing_method,
        options.smoothing_window,
    );

    debug!(
        "Prepared daily series: {} days, outliers removed: {}, smoothing: {:?}",
        original.len(),
        options.remove_outliers,
        options.smoothing_method
    );

    PreparedSeries { original, cleaned }
}

pub fn series_stats(values: &[f64]) -> SeriesStats {
    let m = mean(values);
    let std_dev = sample_std_dev(values).unwrap_or(0.0);
    let volatility_pct = if m > 0.0 { std_dev / m * 100.0 } else { 0.0 };

    SeriesStats {
        mean: m,
        std_dev,
        volatility_pct,
    }
}

/// Relative daily-demand volatility of one store/segment, clipped to [0, 1].
///
/// Falls back to 0.3 when there is too little data to measure it.
pub fn segment_volatility(records: &[SalesRecord], store: &str, segment: &str) -> f64 {
    const DEFAULT_VOLATILITY: f64 = 0.3;

    let filtered: Vec<SalesRecord> = records
        .iter()
        .filter(|r| r.store == store && r.segment == segment)
        .cloned()
        .collect();

    if filtered.len() < 2 {
        return DEFAULT_VOLATILITY;
    }

    let daily = build_daily_series(&filtered).values();
    let m = mean(&daily);
    if m == 0.0 {
        return DEFAULT_VOLATILITY;
    }

    match sample_std_dev(&daily) {
        Some(std_dev) => (std_dev / m).clamp(0.0, 1.0),
        None => {
            warn!("Only one sales day for {} / {}, using default volatility", store, segment);
            DEFAULT_VOLATILITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::statistics::population_std_dev;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn record(day: u32, store: &str, segment: &str, quantity: i64) -> SalesRecord {
        SalesRecord {
            store: store.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            product_id: "P1".to_string(),
            description: "Widget".to_string(),
            model: "W-1".to_string(),
            segment: segment.to_string(),
            unit_price: BigDecimal::from(10),
            quantity,
            amount: BigDecimal::from(10 * quantity),
        }
    }

    #[test]
    fn test_iqr_clips_spike_and_keeps_length() {
        let values = vec![10.0, 12.0, 11.0, 13.0, 12.0, 100.0, 11.0, 12.0];
        let sorted = sorted_copy(&values);
        let q1 = quantile_sorted(&sorted, 0.25).unwrap();
        let q3 = quantile_sorted(&sorted, 0.75).unwrap();
        let upper = q3 + 1.5 * (q3 - q1);

        let clipped = remove_outliers_iqr(&values, IQR_MULTIPLIER);

        assert_eq!(clipped.len(), values.len());
        assert!(clipped.iter().cloned().fold(f64::MIN, f64::max) <= upper + 1e-12);
        assert!((clipped[5] - upper).abs() < 1e-12);
        assert_eq!(clipped[0], 10.0);
    }

    #[test]
    fn test_iqr_noop_below_four_points() {
        let values = vec![1.0, 500.0, 2.0];
        assert_eq!(remove_outliers_iqr(&values, IQR_MULTIPLIER), values);
    }

    #[test]
    fn test_moving_average_centered_with_partial_edges() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = moving_average(&values, 3);

        assert_eq!(smoothed.len(), 5);
        assert!((smoothed[0] - 1.5).abs() < 1e-12);
        assert!((smoothed[2] - 3.0).abs() < 1e-12);
        assert!((smoothed[4] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_even_window_leans_back() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let smoothed = moving_average(&values, 4);
        // label 2 covers indices 0..=3
        assert!((smoothed[2] - 2.5).abs() < 1e-12);
        // label 0 covers indices 0..=1
        assert!((smoothed[0] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_smoothing_recursion() {
        let values = vec![10.0, 20.0, 30.0];
        let smoothed = exponential_smoothing(&values, 3);
        // alpha = 0.5
        assert_eq!(smoothed, vec![10.0, 15.0, 22.5]);
    }

    #[test]
    fn test_smoothing_does_not_increase_spread() {
        let values: Vec<f64> = (0..60)
            .map(|i| 50.0 + 15.0 * ((i as f64) * 1.3).sin() + if i % 7 == 0 { 25.0 } else { 0.0 })
            .collect();
        let base = population_std_dev(&values);

        for method in [SmoothingMethod::MovingAverage, SmoothingMethod::Exponential] {
            let smoothed = smooth(&values, method, 7);
            assert!(population_std_dev(&smoothed) <= base + 1e-9, "{:?}", method);
        }
    }

    #[test]
    fn test_savitzky_golay_falls_back_when_window_too_large() {
        let values = vec![3.0, 9.0, 4.0, 8.0];
        assert_eq!(savitzky_golay(&values, 7), moving_average(&values, 7));
    }

    #[test]
    fn test_savitzky_golay_even_window_is_widened() {
        let values: Vec<f64> = (0..20).map(|i| (i as f64 * 0.7).cos() * 10.0 + 20.0).collect();
        assert_eq!(savitzky_golay(&values, 6), savitzky_golay(&values, 7));
    }

    #[test]
    fn test_clean_floors_at_zero() {
        let records = vec![record(1, "S1", "Seg", 0), record(2, "S1", "Seg", 0), record(3, "S1", "Seg", 40)];
        let series = build_daily_series(&records);

        let cleaned = clean(&series, false, SmoothingMethod::SavitzkyGolay, 3);

        assert_eq!(cleaned.len(), 3);
        assert!(cleaned.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_build_daily_series_sums_per_date() {
        let records = vec![record(2, "S1", "Seg", 3), record(1, "S1", "Seg", 1), record(2, "S2", "Seg", 4)];
        let series = build_daily_series(&records);

        assert_eq!(series.values(), vec![1.0, 7.0]);
    }

    #[test]
    fn test_build_daily_series_keeps_gaps() {
        let records = vec![record(1, "S1", "Seg", 2), record(5, "S1", "Seg", 3)];
        let series = build_daily_series(&records);

        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_series_stats_zero_mean() {
        let stats = series_stats(&[0.0, 0.0, 0.0]);
        assert_eq!(stats.volatility_pct, 0.0);
    }

    #[test]
    fn test_segment_volatility_defaults_and_clamps() {
        let sparse = vec![record(1, "S1", "Seg", 5)];
        assert_eq!(segment_volatility(&sparse, "S1", "Seg"), 0.3);

        let spiky = vec![
            record(1, "S1", "Seg", 1),
            record(2, "S1", "Seg", 1),
            record(3, "S1", "Seg", 100),
        ];
        assert_eq!(segment_volatility(&spiky, "S1", "Seg"), 1.0);
    }
}
