use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::{
    DatasetSummary, MonthlyStat, ProductSales, SalesOverview, SalesRecord, WeekdayStat,
};
use crate::services::preprocessing_service::build_daily_series;
use crate::services::statistics::mean;

pub fn dataset_summary(records: &[SalesRecord]) -> DatasetSummary {
    let products: BTreeSet<&str> = records.iter().map(|r| r.product_id.as_str()).collect();
    let stores: BTreeSet<&str> = records.iter().map(|r| r.store.as_str()).collect();
    let segments: BTreeSet<&str> = records.iter().map(|r| r.segment.as_str()).collect();
    let daily = build_daily_series(records);

    DatasetSummary {
        records: records.len(),
        unique_products: products.len(),
        stores: stores.len(),
        segments: segments.len(),
        start: records.iter().map(|r| r.date).min(),
        end: records.iter().map(|r| r.date).max(),
        total_revenue: records.iter().map(|r| r.amount_f64()).sum(),
        mean_daily_quantity: mean(&daily.values()),
    }
}

/// Quantity and revenue per day of week, Monday first. Days without sales
/// are reported with zeros.
pub fn weekday_breakdown(records: &[SalesRecord]) -> Vec<WeekdayStat> {
    let mut totals = [(0i64, 0.0f64); 7];
    for r in records {
        let slot = &mut totals[r.date.weekday().num_days_from_monday() as usize];
        slot.0 += r.quantity;
        slot.1 += r.amount_f64();
    }

    let mut day = Weekday::Mon;
    totals
        .iter()
        .map(|(quantity, revenue)| {
            let stat = WeekdayStat {
                weekday: day,
                quantity: *quantity,
                revenue: *revenue,
            };
            day = day.succ();
            stat
        })
        .collect()
}

/// Best-selling models by revenue
pub fn top_products(records: &[SalesRecord], n: usize) -> Vec<ProductSales> {
    let mut by_model: HashMap<&str, (i64, f64)> = HashMap::new();
    for r in records {
        let entry = by_model.entry(r.model.as_str()).or_insert((0, 0.0));
        entry.0 += r.quantity;
        entry.1 += r.amount_f64();
    }

    let mut products: Vec<ProductSales> = by_model
        .into_iter()
        .map(|(model, (quantity, revenue))| ProductSales {
            model: model.to_string(),
            quantity,
            revenue,
        })
        .collect();

    // Name as tie-breaker keeps the order independent of hashing
    products.sort_by(|a, b| b.revenue.total_cmp(&a.revenue).then_with(|| a.model.cmp(&b.model)));
    products.truncate(n);
    products
}

pub fn monthly_breakdown(records: &[SalesRecord]) -> Vec<MonthlyStat> {
    let mut months: BTreeMap<NaiveDate, (i64, f64, BTreeSet<&str>)> = BTreeMap::new();
    for r in records {
        let Some(month) = r.date.with_day(1) else {
            continue;
        };
        let entry = months.entry(month).or_default();
        entry.0 += r.quantity;
        entry.1 += r.amount_f64();
        entry.2.insert(r.product_id.as_str());
    }

    months
        .into_iter()
        .map(|(month, (quantity, revenue, products))| MonthlyStat {
            month,
            quantity,
            revenue,
            distinct_products: products.len(),
        })
        .collect()
}

pub fn overview(records: &[SalesRecord], top: usize) -> SalesOverview {
    SalesOverview {
        weekdays: weekday_breakdown(records),
        top_products: top_products(records, top),
        monthly: monthly_breakdown(records),
    }
}
