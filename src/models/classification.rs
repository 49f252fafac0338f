use serde::{Deserialize, Serialize};

use super::SalesRecord;
use crate::config::{ABC_THRESHOLDS, XYZ_THRESHOLDS};

/// Record field used to group transactions into products
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    #[default]
    ProductId,
    Model,
}

impl GroupKey {
    pub fn key<'a>(&self, record: &'a SalesRecord) -> &'a str {
        match self {
            GroupKey::ProductId => &record.product_id,
            GroupKey::Model => &record.model,
        }
    }
}

/// Revenue tier from the Pareto ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

impl AbcClass {
    pub const ALL: [AbcClass; 3] = [AbcClass::A, AbcClass::B, AbcClass::C];

    /// Boundaries are inclusive of the lower class: exactly 80% is still A.
    pub fn from_cumulative_share(cumulative_pct: f64) -> Self {
        let (a_limit, b_limit) = ABC_THRESHOLDS;
        if cumulative_pct <= a_limit {
            AbcClass::A
        } else if cumulative_pct <= b_limit {
            AbcClass::B
        } else {
            AbcClass::C
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            AbcClass::A => 'A',
            AbcClass::B => 'B',
            AbcClass::C => 'C',
        }
    }
}

/// Demand-stability tier from the coefficient of variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum XyzClass {
    X,
    Y,
    Z,
}

impl XyzClass {
    pub const ALL: [XyzClass; 3] = [XyzClass::X, XyzClass::Y, XyzClass::Z];

    pub fn from_cv(cv_pct: f64) -> Self {
        let (x_limit, y_limit) = XYZ_THRESHOLDS;
        if cv_pct <= x_limit {
            XyzClass::X
        } else if cv_pct <= y_limit {
            XyzClass::Y
        } else {
            XyzClass::Z
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            XyzClass::X => 'X',
            XyzClass::Y => 'Y',
            XyzClass::Z => 'Z',
        }
    }
}

/// One product in the combined ABC/XYZ table.
///
/// Either axis may be missing when the product only appears on the other
/// side of the join; `combined_class` is set only when both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRow {
    pub product_id: String,
    pub revenue: Option<f64>,
    pub revenue_share_pct: Option<f64>,
    pub cumulative_share_pct: Option<f64>,
    pub abc_class: Option<AbcClass>,
    pub quantity: i64,
    pub coefficient_of_variation: Option<f64>,
    pub xyz_class: Option<XyzClass>,
    pub combined_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcClassStats {
    pub class: AbcClass,
    pub products: usize,
    pub revenue: f64,
    pub revenue_share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XyzClassStats {
    pub class: XyzClass,
    pub products: usize,
    pub revenue: f64,
    pub mean_cv: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecommendation {
    pub combined_class: String,
    pub title: String,
    pub guidance: String,
    pub products: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    pub abc: Vec<AbcClassStats>,
    pub xyz: Vec<XyzClassStats>,
    /// Product counts, rows A..C, columns X..Z
    pub matrix: Vec<Vec<usize>>,
    pub recommendations: Vec<CategoryRecommendation>,
}
