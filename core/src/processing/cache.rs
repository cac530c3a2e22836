use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::processing::config::{FilterConfig, FilterKey};
use crate::processing::engine::FilteredRun;
use crate::processing::StageError;

type Slot = Arc<OnceCell<Arc<FilteredRun>>>;

/// Per-run memo of filter results keyed by [`FilterKey`].
///
/// Each key owns a once-cell: concurrent misses for the same key block on
/// the first computation instead of repeating it. Failed or skipped
/// computations leave no entry behind.
#[derive(Default)]
pub struct FilterCache {
    entries: Mutex<HashMap<FilterKey, Slot>>,
}

/// Where a cached lookup's result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    Hit,
    Computed,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored result for `config`, if one has been computed.
    pub fn get(&self, config: &FilterConfig) -> Option<Arc<FilteredRun>> {
        self.lock()
            .get(&config.key())
            .and_then(|slot| slot.get().cloned())
    }

    /// Number of completed entries.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of completed entries, sorted.
    pub fn keys(&self) -> Vec<FilterKey> {
        let mut keys: Vec<FilterKey> = self
            .lock()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Return the entry for `key`, running `compute` only if no entry exists
    /// and no other caller is already computing it.
    pub(crate) fn get_or_try_insert_with<F>(
        &self,
        key: FilterKey,
        compute: F,
    ) -> Result<(Arc<FilteredRun>, CacheSource), StageError>
    where
        F: FnOnce() -> Result<FilteredRun, StageError>,
    {
        let slot: Slot = Arc::clone(self.lock().entry(key.clone()).or_default());

        let mut source = CacheSource::Hit;
        let outcome = slot.get_or_try_init(|| {
            source = CacheSource::Computed;
            compute().map(Arc::new)
        });

        match outcome {
            Ok(run) => Ok((Arc::clone(run), source)),
            Err(err) => {
                let mut entries = self.lock();
                let stale = entries
                    .get(&key)
                    .map(|current| Arc::ptr_eq(current, &slot) && current.get().is_none())
                    .unwrap_or(false);
                if stale {
                    entries.remove(&key);
                }
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<FilterKey, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCache")
            .field("entries", &self.keys())
            .finish()
    }
}
