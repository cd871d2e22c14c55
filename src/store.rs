//! Session-wide boundary dataset.
//!
//! The boundary collection is fetched once and then read by every
//! aggregation for the rest of the session. Until something is installed the
//! store reports "unavailable" and callers produce empty results.
//!
//! Installing a new collection replaces the handle; readers that already hold
//! the previous `Arc` keep using it until they finish.

use std::sync::{Arc, RwLock};

use log::info;
use once_cell::sync::Lazy;

use crate::boundaries::BoundaryCollection;
use crate::error::{CountryMatchError, Result};
use crate::index::BoundaryIndex;

static GLOBAL_STORE: Lazy<BoundaryStore> = Lazy::new(BoundaryStore::new);

/// Holder for the current session's indexed boundaries.
#[derive(Default)]
pub struct BoundaryStore {
    current: RwLock<Option<Arc<BoundaryIndex>>>,
}

impl BoundaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store used by the FFI layer.
    pub fn global() -> &'static BoundaryStore {
        &GLOBAL_STORE
    }

    /// Index and install a collection, replacing any previous one.
    pub fn install(&self, collection: BoundaryCollection) -> Arc<BoundaryIndex> {
        let feature_count = collection.len();
        let index = Arc::new(BoundaryIndex::new(Arc::new(collection)));

        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Arc::clone(&index));

        info!("[BoundaryStore] Installed {} boundary features", feature_count);
        index
    }

    /// The installed boundaries, or `None` while still loading.
    pub fn current(&self) -> Option<Arc<BoundaryIndex>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Like [`BoundaryStore::current`], as an error when nothing is loaded.
    pub fn require(&self) -> Result<Arc<BoundaryIndex>> {
        self.current().ok_or(CountryMatchError::BoundariesUnavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    /// Drop the installed boundaries.
    pub fn clear(&self) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }
}
