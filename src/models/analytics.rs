use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub unique_products: usize,
    pub stores: usize,
    pub segments: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub total_revenue: f64,
    pub mean_daily_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStat {
    pub weekday: Weekday,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub model: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStat {
    /// First day of the month
    pub month: NaiveDate,
    pub quantity: i64,
    pub revenue: f64,
    pub distinct_products: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOverview {
    pub weekdays: Vec<WeekdayStat>,
    pub top_products: Vec<ProductSales>,
    pub monthly: Vec<MonthlyStat>,
}
