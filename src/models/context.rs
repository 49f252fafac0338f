use serde::{Deserialize, Serialize};

use super::SalesRecord;

/// Store/segment selection carried explicitly by the caller.
///
/// `None` on either axis means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub store: Option<String>,
    pub segment: Option<String>,
}

impl AnalysisContext {
    pub fn new(store: Option<String>, segment: Option<String>) -> Self {
        Self {
            store: store.filter(|s| !s.trim().is_empty()),
            segment: segment.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &SalesRecord) -> bool {
        self.store.as_deref().map_or(true, |s| record.store == s)
            && self.segment.as_deref().map_or(true, |s| record.segment == s)
    }

    pub fn apply(&self, records: &[SalesRecord]) -> Vec<SalesRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }

    pub fn label(&self) -> String {
        format!(
            "{} / {}",
            self.store.as_deref().unwrap_or("all stores"),
            self.segment.as_deref().unwrap_or("all segments")
        )
    }
}

/// Sorted unique store names.
pub fn available_stores(records: &[SalesRecord]) -> Vec<String> {
    let mut stores: Vec<String> = records.iter().map(|r| r.store.clone()).collect();
    stores.sort();
    stores.dedup();
    stores
}

/// Sorted unique segments, restricted to `store` when one is given.
pub fn available_segments(records: &[SalesRecord], store: Option<&str>) -> Vec<String> {
    let mut segments: Vec<String> = records
        .iter()
        .filter(|r| store.map_or(true, |s| r.store == s))
        .map(|r| r.segment.clone())
        .collect();
    segments.sort();
    segments.dedup();
    segments
}
