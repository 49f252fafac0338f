use std::path::PathBuf;
use std::sync::Arc;

use crate::external::additive_model::{AdditiveModel, ModelSettings};
use crate::services::analysis_cache::AnalysisCache;
use crate::store::SalesStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SalesStore,
    pub model: Arc<dyn AdditiveModel>,
    pub model_settings: ModelSettings,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(store: SalesStore, model: Arc<dyn AdditiveModel>, data_dir: PathBuf) -> Self {
        Self {
            store,
            model,
            model_settings: ModelSettings::default(),
            data_dir,
        }
    }

    pub fn cache(&self) -> &AnalysisCache {
        self.store.cache()
    }
}
