mod analytics;
mod classification;
mod context;
mod elasticity;
mod forecast;
mod sales;

pub use analytics::{DatasetSummary, MonthlyStat, ProductSales, SalesOverview, WeekdayStat};
pub use classification::{
    AbcClass, AbcClassStats, CategoryRecommendation, ClassificationRow, ClassificationSummary,
    GroupKey, XyzClass, XyzClassStats,
};
pub use context::{available_segments, available_stores, AnalysisContext};
pub use elasticity::{ElasticityClass, ElasticityRow, ElasticitySummary};
pub use forecast::{
    AccuracyMetrics, ForecastReport, ForecastResult, ForecastStatistics, ScenarioSet, SeriesStats,
};
pub use sales::{DailySeries, SalesRecord, SeriesPoint};
