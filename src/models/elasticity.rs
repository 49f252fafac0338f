use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElasticityClass {
    Elastic,
    Inelastic,
    Unit,
}

impl ElasticityClass {
    pub fn from_coefficient(elasticity: f64) -> Self {
        let magnitude = elasticity.abs();
        if magnitude > 1.0 {
            ElasticityClass::Elastic
        } else if magnitude < 1.0 {
            ElasticityClass::Inelastic
        } else {
            ElasticityClass::Unit
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            ElasticityClass::Elastic => "Lowering the price should increase revenue",
            ElasticityClass::Inelastic => "Raising the price should increase revenue",
            ElasticityClass::Unit => "Price is near-optimal",
        }
    }
}

/// Price sensitivity of one product, measured between its lowest and highest
/// price buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticityRow {
    pub product_id: String,
    pub elasticity_coefficient: f64,
    pub classification: ElasticityClass,
    pub avg_price: f64,
    pub total_revenue: f64,
    pub total_quantity: i64,
    pub price_change_pct: f64,
    pub quantity_change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticitySummary {
    pub analyzed: usize,
    pub elastic_count: usize,
    pub inelastic_count: usize,
    pub unit_count: usize,
    pub elastic_revenue_share_pct: f64,
    pub inelastic_revenue_share_pct: f64,
}
