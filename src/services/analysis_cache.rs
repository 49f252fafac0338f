use std::any::Any;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::AnalysisOptions;
use crate::errors::AppError;
use crate::models::{AnalysisContext, GroupKey};

/// Which analysis a cached value belongs to, with the parameters that shape it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Forecast(AnalysisOptions),
    Classification(GroupKey),
    Elasticity { min_records: usize, group_key: GroupKey },
    Overview { top: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Content fingerprint of the dataset the value was computed from
    pub fingerprint: u64,
    pub context: AnalysisContext,
    pub kind: AnalysisKind,
}

/// Upper bound on stored results; the oldest entry is evicted first
pub const MAX_CACHE_ENTRIES: usize = 256;

#[derive(Clone)]
struct CachedValue {
    value: Arc<dyn Any + Send + Sync>,
    computed_at: DateTime<Utc>,
}

/// Memoized analysis results, keyed by dataset fingerprint, request context
/// and parameters.
///
/// Installing a new dataset calls [`AnalysisCache::set_current_fingerprint`],
/// which drops results of the previous dataset. Results that finish computing
/// after the swap carry the old fingerprint and are not stored.
#[derive(Clone, Default)]
pub struct AnalysisCache {
    cache: Arc<DashMap<CacheKey, CachedValue>>,
    current: Arc<RwLock<Option<u64>>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<T>> {
        let entry = self.cache.get(key)?;
        entry.value().value.clone().downcast::<T>().ok()
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: CacheKey, value: Arc<T>) {
        // Held across the insert so a concurrent dataset swap cannot interleave
        let current = self.current.read();
        if current.map_or(false, |fingerprint| fingerprint != key.fingerprint) {
            debug!(
                "Discarding {:?} ({}) computed from a replaced dataset",
                key.kind,
                key.context.label()
            );
            return;
        }

        if self.cache.len() >= MAX_CACHE_ENTRIES && !self.cache.contains_key(&key) {
            self.evict_oldest();
        }

        self.cache.insert(
            key,
            CachedValue {
                value,
                computed_at: Utc::now(),
            },
        );
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    /// Failures are not cached.
    pub fn get_or_compute<T, F>(&self, key: CacheKey, compute: F) -> Result<Arc<T>, AppError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, AppError>,
    {
        if let Some(hit) = self.get::<T>(&key) {
            debug!("Cache hit for {:?} ({})", key.kind, key.context.label());
            return Ok(hit);
        }

        debug!("Cache miss for {:?} ({})", key.kind, key.context.label());
        let value = Arc::new(compute()?);
        self.insert(key, value.clone());
        Ok(value)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|entry| entry.value().computed_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            debug!("Evicting {:?} ({}) from analysis cache", key.kind, key.context.label());
            self.cache.remove(&key);
        }
    }

    /// Marks `fingerprint` as the installed dataset and drops everything
    /// computed from any other
    pub fn set_current_fingerprint(&self, fingerprint: u64) {
        let mut current = self.current.write();
        *current = Some(fingerprint);
        self.retain_fingerprint(fingerprint);
    }

    /// Drops every entry not computed from `fingerprint`
    pub fn retain_fingerprint(&self, fingerprint: u64) {
        self.cache.retain(|key, _| key.fingerprint == fingerprint);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn key(fingerprint: u64, kind: AnalysisKind) -> CacheKey {
        CacheKey {
            fingerprint,
            context: AnalysisContext::all(),
            kind,
        }
    }

    #[test]
    fn test_computes_once_per_key() {
        let cache = AnalysisCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, AppError>(vec![1.0, 2.0])
        };

        let first = cache
            .get_or_compute(key(1, AnalysisKind::Overview { top: 5 }), compute)
            .unwrap();
        let second = cache
            .get_or_compute(key(1, AnalysisKind::Overview { top: 5 }), || {
                calls.set(calls.get() + 1);
                Ok::<_, AppError>(vec![9.0])
            })
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_parameters_and_context_are_part_of_the_key() {
        let cache = AnalysisCache::new();
        cache.insert(key(1, AnalysisKind::Classification(GroupKey::ProductId)), Arc::new(1u32));
        cache.insert(key(1, AnalysisKind::Classification(GroupKey::Model)), Arc::new(2u32));

        let mut scoped = key(1, AnalysisKind::Classification(GroupKey::Model));
        scoped.context = AnalysisContext::new(Some("S1".to_string()), None);
        assert!(cache.get::<u32>(&scoped).is_none());

        assert_eq!(cache.len(), 2);
        assert_eq!(
            *cache
                .get::<u32>(&key(1, AnalysisKind::Classification(GroupKey::Model)))
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = AnalysisCache::new();
        let k = key(1, AnalysisKind::Forecast(AnalysisOptions::default()));

        let failed: Result<Arc<u8>, AppError> =
            cache.get_or_compute(k.clone(), || Err(AppError::ModelFit("boom".to_string())));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let ok = cache.get_or_compute(k, || Ok(7u8)).unwrap();
        assert_eq!(*ok, 7);
    }

    #[test]
    fn test_invalidation() {
        let cache = AnalysisCache::new();
        cache.insert(key(1, AnalysisKind::Overview { top: 10 }), Arc::new("old"));
        cache.insert(key(2, AnalysisKind::Overview { top: 10 }), Arc::new("new"));

        cache.retain_fingerprint(2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get::<&str>(&key(1, AnalysisKind::Overview { top: 10 })).is_none());
    }

    #[test]
    fn test_results_from_replaced_dataset_are_discarded() {
        let cache = AnalysisCache::new();
        cache.set_current_fingerprint(1);
        cache.insert(key(1, AnalysisKind::Overview { top: 10 }), Arc::new(1u32));

        // a computation started on dataset 1 finishes after dataset 2 is installed
        let late = cache.get_or_compute(key(1, AnalysisKind::Overview { top: 5 }), || {
            cache.set_current_fingerprint(2);
            Ok::<_, AppError>(5u32)
        });

        assert_eq!(*late.unwrap(), 5);
        assert!(cache.is_empty());

        cache.insert(key(2, AnalysisKind::Overview { top: 5 }), Arc::new(6u32));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_size_is_bounded() {
        let cache = AnalysisCache::new();
        for top in 0..MAX_CACHE_ENTRIES + 10 {
            cache.insert(key(1, AnalysisKind::Overview { top }), Arc::new(top));
        }

        assert_eq!(cache.len(), MAX_CACHE_ENTRIES);
        let newest = key(1, AnalysisKind::Overview { top: MAX_CACHE_ENTRIES + 9 });
        assert!(cache.get::<usize>(&newest).is_some());
    }
}
