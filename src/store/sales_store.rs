use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use crate::models::SalesRecord;
use crate::services::analysis_cache::AnalysisCache;

/// Immutable view of the installed dataset
#[derive(Debug, Clone)]
pub struct DatasetSnapshot {
    pub records: Arc<Vec<SalesRecord>>,
    pub fingerprint: u64,
    pub source: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
}

/// In-memory sales ledger shared by all requests.
///
/// Readers take a cheap snapshot; `replace` swaps the whole dataset and
/// drops every cached analysis computed from the previous one.
#[derive(Clone)]
pub struct SalesStore {
    current: Arc<RwLock<DatasetSnapshot>>,
    cache: AnalysisCache,
}

pub fn fingerprint(records: &[SalesRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    records.len().hash(&mut hasher);
    for record in records {
        record.hash(&mut hasher);
    }
    hasher.finish()
}

impl SalesStore {
    pub fn new(cache: AnalysisCache) -> Self {
        Self::with_records(Vec::new(), None, cache)
    }

    pub fn with_records(
        records: Vec<SalesRecord>,
        source: Option<PathBuf>,
        cache: AnalysisCache,
    ) -> Self {
        let fingerprint = fingerprint(&records);
        cache.set_current_fingerprint(fingerprint);

        Self {
            current: Arc::new(RwLock::new(DatasetSnapshot {
                fingerprint,
                records: Arc::new(records),
                source,
                loaded_at: Utc::now(),
            })),
            cache,
        }
    }

    pub fn snapshot(&self) -> DatasetSnapshot {
        self.current.read().clone()
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Installs a new dataset and invalidates cached results. Returns the new
    /// fingerprint.
    pub fn replace(&self, records: Vec<SalesRecord>, source: Option<PathBuf>) -> u64 {
        let new_fingerprint = fingerprint(&records);
        let count = records.len();

        {
            let mut current = self.current.write();
            *current = DatasetSnapshot {
                records: Arc::new(records),
                fingerprint: new_fingerprint,
                source,
                loaded_at: Utc::now(),
            };
        }

        self.cache.set_current_fingerprint(new_fingerprint);
        info!(
            "Installed dataset with {} records (fingerprint {:016x}), analysis cache cleared",
            count, new_fingerprint
        );

        new_fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisContext;
    use crate::services::analysis_cache::{AnalysisKind, CacheKey};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn record(quantity: i64) -> SalesRecord {
        SalesRecord {
            store: "S1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            product_id: "P".to_string(),
            description: String::new(),
            model: "M".to_string(),
            segment: "Seg".to_string(),
            unit_price: BigDecimal::from(3),
            quantity,
            amount: BigDecimal::from(3 * quantity),
        }
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        assert_eq!(fingerprint(&[record(1)]), fingerprint(&[record(1)]));
        assert_ne!(fingerprint(&[record(1)]), fingerprint(&[record(2)]));
        assert_ne!(fingerprint(&[]), fingerprint(&[record(1)]));
    }

    #[test]
    fn test_replace_invalidates_cache() {
        let store = SalesStore::with_records(vec![record(1)], None, AnalysisCache::new());
        let before = store.snapshot().fingerprint;

        store.cache().insert(
            CacheKey {
                fingerprint: before,
                context: AnalysisContext::all(),
                kind: AnalysisKind::Overview { top: 10 },
            },
            Arc::new(42u32),
        );
        assert_eq!(store.cache().len(), 1);

        let after = store.replace(vec![record(1), record(5)], Some(PathBuf::from("data/new.csv")));

        assert_ne!(before, after);
        assert!(store.cache().is_empty());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.records.len(), 2);
        assert_eq!(snapshot.source, Some(PathBuf::from("data/new.csv")));
    }
}
