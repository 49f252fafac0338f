use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use sales_analytics::app;
use sales_analytics::config::ServerConfig;
use sales_analytics::external::seasonal_trend::SeasonalTrendModel;
use sales_analytics::logging::{init_logging, LoggingConfig};
use sales_analytics::services::analysis_cache::AnalysisCache;
use sales_analytics::services::csv_import_service;
use sales_analytics::state::AppState;
use sales_analytics::store::SalesStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = ServerConfig::from_env()?;
    let store = SalesStore::new(AnalysisCache::new());

    if let Some(path) = &config.sales_data_path {
        match csv_import_service::load_sales_csv(path) {
            Ok(result) => {
                store.replace(result.records, Some(path.clone()));
            }
            Err(e) => warn!("Could not load initial dataset {:?}: {:#}", path, e),
        }
    } else {
        info!("SALES_DATA_PATH not set, starting with an empty dataset");
    }

    let state = AppState::new(store, Arc::new(SeasonalTrendModel::new()), config.data_dir.clone());
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Sales analytics backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
