pub mod abc_xyz_service;
pub mod analysis_cache;
pub mod analytics_service;
pub mod csv_import_service;
pub mod elasticity_service;
pub mod export_service;
pub mod forecasting_service;
pub mod preprocessing_service;
pub mod savitzky_golay;
pub mod statistics;
