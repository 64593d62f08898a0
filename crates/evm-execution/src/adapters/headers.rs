//! # In-Memory Header Store
//!
//! Retains historical headers keyed by height, optionally pruning everything
//! older than a retention window.

use crate::domain::entities::{BlockHeader, HistoricalHeader};
use crate::domain::services::header_hash;
use crate::ports::outbound::HeaderStore;
use std::collections::BTreeMap;

/// Header store backed by a `BTreeMap`.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHeaderStore {
    headers: BTreeMap<u64, HistoricalHeader>,
    retention: Option<u64>,
}

impl InMemoryHeaderStore {
    /// Create a store that keeps every header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that keeps only the last `retention` heights.
    #[must_use]
    pub fn with_retention(retention: u64) -> Self {
        Self {
            headers: BTreeMap::new(),
            retention: Some(retention),
        }
    }

    /// Records a decoded header together with its computed hash.
    pub fn record(&mut self, header: &BlockHeader) {
        self.insert(HistoricalHeader {
            height: header.height,
            hash: header_hash(header),
            header: header.encode(),
        });
    }

    /// Stores a raw entry as-is.
    pub fn insert(&mut self, entry: HistoricalHeader) {
        let height = entry.height;
        self.headers.insert(height, entry);
        if let Some(keep) = self.retention {
            let cutoff = height.saturating_sub(keep);
            self.headers = self.headers.split_off(&cutoff);
        }
    }

    /// Number of stored headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl HeaderStore for InMemoryHeaderStore {
    fn historical_header(&self, height: u64) -> Option<HistoricalHeader> {
        self.headers.get(&height).cloned()
    }
}
