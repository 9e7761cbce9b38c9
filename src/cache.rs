//! Per-source memoization of loaded datasets.
//!
//! Each source path is loaded at most once per process. Concurrent first
//! access to the same source blocks on a single load; a failed load is not
//! remembered, so the next caller retries.

use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::error::DashboardError;
use crate::loader::{self, LoadReport};
use crate::types::Dataset;

/// A dataset together with the diagnostics from the load that produced it.
#[derive(Debug)]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub report: LoadReport,
}

type Slot = Arc<OnceCell<Arc<LoadedDataset>>>;

/// Cache keyed by the absolute path of the source file.
#[derive(Default)]
pub struct DatasetCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the dataset for `path`, reading it on first use.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<LoadedDataset>, DashboardError> {
        let key = std::path::absolute(path).map_err(|source| DashboardError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // The map lock is only held long enough to find or insert the slot,
        // so loads of different sources never wait on each other.
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        if let Some(loaded) = slot.get() {
            debug!(path = %key.display(), "dataset cache hit");
            return Ok(Arc::clone(loaded));
        }

        let loaded = slot.get_or_try_init(|| {
            debug!(path = %key.display(), "dataset cache miss");
            let (dataset, report) = loader::load(&key)?;
            Ok::<_, DashboardError>(Arc::new(LoadedDataset { dataset, report }))
        })?;
        Ok(Arc::clone(loaded))
    }

    /// Number of sources loaded so far.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|s| s.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL: Lazy<DatasetCache> = Lazy::new(DatasetCache::new);

/// Process-wide cache used by the binary. Lives until the process exits.
pub fn global() -> &'static DatasetCache {
    &GLOBAL
}
