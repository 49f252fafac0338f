use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One transaction from the sales ledger.
///
/// `amount` is the authoritative revenue figure; it is never recomputed from
/// `unit_price * quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SalesRecord {
    pub store: String,
    pub date: NaiveDate,
    pub product_id: String,
    pub description: String,
    pub model: String,
    pub segment: String,
    pub unit_price: BigDecimal,
    pub quantity: i64,
    pub amount: BigDecimal,
}

impl SalesRecord {
    pub fn unit_price_f64(&self) -> f64 {
        self.unit_price.to_f64().unwrap_or(0.0)
    }

    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Daily demand series with strictly increasing, unique dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    points: Vec<SeriesPoint>,
}

impl DailySeries {
    /// Builds a series from arbitrary (date, value) pairs. Values that share a
    /// date are summed.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, value) in pairs {
            *by_date.entry(date).or_insert(0.0) += value;
        }

        Self {
            points: by_date
                .into_iter()
                .map(|(date, value)| SeriesPoint { date, value })
                .collect(),
        }
    }

    /// Same dates, new values. `values` must have one entry per point.
    pub fn with_values(&self, values: &[f64]) -> Self {
        debug_assert_eq!(values.len(), self.points.len());
        Self {
            points: self
                .points
                .iter()
                .zip(values)
                .map(|(p, &value)| SeriesPoint { date: p.date, value })
                .collect(),
        }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}
