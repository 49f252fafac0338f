use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::MIN_ELASTICITY_RECORDS;
use crate::errors::AppError;
use crate::models::{
    AnalysisContext, ElasticityClass, ElasticityRow, ElasticitySummary, GroupKey, SalesRecord,
};
use crate::services::statistics::{mean, quantile_sorted, sorted_copy};

#[derive(Debug, Error, PartialEq)]
enum BucketError {
    #[error("price quantiles collapse: {unique} distinct edges for {buckets} buckets")]
    Degenerate { buckets: usize, unique: usize },
}

/// Mean price and total quantity of one price bucket
#[derive(Debug, Clone, Copy, PartialEq)]
struct PriceBucket {
    mean_price: f64,
    quantity: i64,
}

/// Quantile edges for `buckets` equal-frequency buckets; fails when edges
/// repeat.
fn quantile_edges(sorted_prices: &[f64], buckets: usize) -> Result<Vec<f64>, BucketError> {
    let mut edges: Vec<f64> = (0..=buckets)
        .filter_map(|i| quantile_sorted(sorted_prices, i as f64 / buckets as f64))
        .collect();
    edges.dedup();

    if edges.len() != buckets + 1 {
        return Err(BucketError::Degenerate {
            buckets,
            unique: edges.len(),
        });
    }
    Ok(edges)
}

/// Groups sales into low/medium/high price buckets, or low/high when three
/// buckets cannot be formed. Bins are closed on the right and the first one
/// also holds the lowest price. Empty buckets are left out.
fn price_buckets(prices: &[f64], quantities: &[i64]) -> Result<Vec<PriceBucket>, BucketError> {
    let sorted = sorted_copy(prices);
    let edges = quantile_edges(&sorted, 3).or_else(|_| quantile_edges(&sorted, 2))?;
    let count = edges.len() - 1;

    let mut price_sums = vec![0.0; count];
    let mut members = vec![0usize; count];
    let mut totals = vec![0i64; count];

    for (price, quantity) in prices.iter().zip(quantities) {
        let bucket = (0..count)
            .find(|&i| *price <= edges[i + 1])
            .unwrap_or(count - 1);
        price_sums[bucket] += price;
        members[bucket] += 1;
        totals[bucket] += quantity;
    }

    Ok((0..count)
        .filter(|&i| members[i] > 0)
        .map(|i| PriceBucket {
            mean_price: price_sums[i] / members[i] as f64,
            quantity: totals[i],
        })
        .collect())
}

/// Elasticity of one product between its cheapest and dearest buckets.
/// `None` when the product carries no usable price signal.
fn product_elasticity(product_id: &str, sales: &[&SalesRecord]) -> Option<ElasticityRow> {
    let prices: Vec<f64> = sales.iter().map(|r| r.unit_price_f64()).collect();
    let quantities: Vec<i64> = sales.iter().map(|r| r.quantity).collect();

    let buckets = match price_buckets(&prices, &quantities) {
        Ok(buckets) => buckets,
        Err(e) => {
            debug!("Skipping {}: {}", product_id, e);
            return None;
        }
    };

    let (low, high) = match (buckets.first(), buckets.last()) {
        (Some(low), Some(high)) if buckets.len() >= 2 => (*low, *high),
        _ => return None,
    };

    if low.mean_price == high.mean_price || low.quantity == 0 {
        debug!("Skipping {}: zero denominator between price buckets", product_id);
        return None;
    }

    let price_change_pct = (high.mean_price - low.mean_price) / low.mean_price * 100.0;
    let quantity_change_pct =
        (high.quantity - low.quantity) as f64 / low.quantity as f64 * 100.0;
    let elasticity = quantity_change_pct / price_change_pct;

    Some(ElasticityRow {
        product_id: product_id.to_string(),
        elasticity_coefficient: elasticity,
        classification: ElasticityClass::from_coefficient(elasticity),
        avg_price: mean(&prices),
        total_revenue: sales.iter().map(|r| r.amount_f64()).sum(),
        total_quantity: quantities.iter().sum(),
        price_change_pct,
        quantity_change_pct,
    })
}

/// Price elasticity per product with at least `min_records` sales, highest
/// revenue first. Products without a usable price spread are left out.
pub fn estimate(
    records: &[SalesRecord],
    min_records: usize,
    group_key: GroupKey,
) -> Vec<ElasticityRow> {
    // First-appearance order, so revenue ties keep ledger order
    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&SalesRecord>> = HashMap::new();
    for record in records {
        let key = group_key.key(record);
        grouped
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(record);
    }

    let mut rows: Vec<ElasticityRow> = order
        .iter()
        .filter_map(|product| {
            let sales = grouped.get(product)?;
            if sales.len() < min_records {
                return None;
            }
            product_elasticity(product, sales)
        })
        .collect();

    rows.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));

    info!(
        "Estimated elasticity for {} of {} products (min {} records)",
        rows.len(),
        order.len(),
        min_records
    );

    rows
}

/// Filters to the store/segment and estimates elasticity.
///
/// A filtered ledger below the minimum is an error, so callers can tell
/// missing data apart from products without a price signal.
pub fn run_estimate(
    records: &[SalesRecord],
    context: &AnalysisContext,
    min_records: usize,
    group_key: GroupKey,
) -> Result<Vec<ElasticityRow>, AppError> {
    let filtered = context.apply(records);
    if filtered.len() < MIN_ELASTICITY_RECORDS {
        return Err(AppError::InsufficientData {
            required: MIN_ELASTICITY_RECORDS,
            actual: filtered.len(),
        });
    }

    Ok(estimate(&filtered, min_records, group_key))
}

/// Class counts and the revenue share held by elastic and inelastic products
pub fn summarize(rows: &[ElasticityRow]) -> ElasticitySummary {
    let total_revenue: f64 = rows.iter().map(|r| r.total_revenue).sum();
    let revenue_share = |class: ElasticityClass| {
        if total_revenue > 0.0 {
            rows.iter()
                .filter(|r| r.classification == class)
                .map(|r| r.total_revenue)
                .sum::<f64>()
                * 100.0
                / total_revenue
        } else {
            0.0
        }
    };
    let count = |class: ElasticityClass| rows.iter().filter(|r| r.classification == class).count();

    ElasticitySummary {
        analyzed: rows.len(),
        elastic_count: count(ElasticityClass::Elastic),
        inelastic_count: count(ElasticityClass::Inelastic),
        unit_count: count(ElasticityClass::Unit),
        elastic_revenue_share_pct: revenue_share(ElasticityClass::Elastic),
        inelastic_revenue_share_pct: revenue_share(ElasticityClass::Inelastic),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn sale(product: &str, day: u32, price: i64, quantity: i64) -> SalesRecord {
        SalesRecord {
            store: "North".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            product_id: product.to_string(),
            description: String::new(),
            model: format!("M-{}", product),
            segment: "Audio".to_string(),
            unit_price: BigDecimal::from(price),
            quantity,
            amount: BigDecimal::from(price * quantity),
        }
    }

    /// Five sales at 10 (100 units) and five at 20 (80 units)
    fn two_price_product(product: &str) -> Vec<SalesRecord> {
        let mut records = Vec::new();
        for day in 1..=5 {
            records.push(sale(product, day, 10, 20));
            records.push(sale(product, day + 5, 20, 16));
        }
        records
    }

    #[test]
    fn test_two_regime_example_is_inelastic() {
        let rows = estimate(&two_price_product("P"), 10, GroupKey::ProductId);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert!((row.price_change_pct - 100.0).abs() < 1e-9);
        assert!((row.quantity_change_pct + 20.0).abs() < 1e-9);
        assert!((row.elasticity_coefficient + 0.2).abs() < 1e-9);
        assert_eq!(row.classification, ElasticityClass::Inelastic);
        assert_eq!(row.total_quantity, 180);
        assert!((row.avg_price - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_buckets_use_extremes_only() {
        let mut records = Vec::new();
        for (i, price) in [10, 10, 10, 15, 15, 15, 20, 20, 20].iter().enumerate() {
            let quantity = match price {
                10 => 30,
                15 => 1,
                _ => 10,
            };
            records.push(sale("P", i as u32 + 1, *price, quantity));
        }

        let rows = estimate(&records, 9, GroupKey::ProductId);
        // 90 units at 10 vs 30 units at 20: -66.7% / +100%
        assert!((rows[0].elasticity_coefficient + 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_price_is_skipped() {
        let records: Vec<SalesRecord> = (1..=12).map(|d| sale("FLAT", d, 25, 3)).collect();
        assert!(estimate(&records, 10, GroupKey::ProductId).is_empty());

        let prices = vec![25.0; 12];
        let quantities = vec![3; 12];
        assert_eq!(
            price_buckets(&prices, &quantities),
            Err(BucketError::Degenerate { buckets: 2, unique: 1 })
        );
    }

    #[test]
    fn test_zero_base_quantity_is_skipped() {
        let mut records = Vec::new();
        for day in 1..=5 {
            records.push(sale("P", day, 10, 0));
            records.push(sale("P", day + 5, 20, 4));
        }
        assert!(estimate(&records, 10, GroupKey::ProductId).is_empty());
    }

    #[test]
    fn test_min_records_threshold() {
        let records = two_price_product("P");
        assert!(estimate(&records, 11, GroupKey::ProductId).is_empty());
        assert_eq!(estimate(&records, 10, GroupKey::ProductId).len(), 1);
    }

    #[test]
    fn test_elastic_product_and_revenue_order() {
        let mut records = two_price_product("SMALL");
        for day in 1..=5 {
            records.push(sale("BIG", day, 100, 50));
            records.push(sale("BIG", day + 5, 120, 10));
        }

        let rows = estimate(&records, 10, GroupKey::ProductId);

        assert_eq!(rows[0].product_id, "BIG");
        assert_eq!(rows[0].classification, ElasticityClass::Elastic);
        assert_eq!(rows[1].product_id, "SMALL");

        let summary = summarize(&rows);
        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.elastic_count, 1);
        assert_eq!(summary.inelastic_count, 1);
        let total = summary.elastic_revenue_share_pct + summary.inelastic_revenue_share_pct;
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_estimate_requires_ten_records() {
        let records = two_price_product("P");
        let north = AnalysisContext::new(Some("North".to_string()), None);

        let result = run_estimate(&records[..3], &north, 2, GroupKey::ProductId);
        assert!(matches!(
            result,
            Err(AppError::InsufficientData { required: 10, actual: 3 })
        ));

        let south = AnalysisContext::new(Some("South".to_string()), None);
        assert!(matches!(
            run_estimate(&records, &south, 10, GroupKey::ProductId),
            Err(AppError::InsufficientData { required: 10, actual: 0 })
        ));

        assert_eq!(run_estimate(&records, &north, 10, GroupKey::ProductId).unwrap().len(), 1);
    }

    #[test]
    fn test_unit_elasticity() {
        assert_eq!(ElasticityClass::from_coefficient(-1.0), ElasticityClass::Unit);
        assert_eq!(
            ElasticityClass::Unit.recommendation(),
            "Price is near-optimal"
        );
    }
}
