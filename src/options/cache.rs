//! Pool options cache.
//!
//! Maps an application group name to the shared, immutable options snapshot
//! derived the first time that group was seen. Names are raw header bytes
//! and compare byte-exact, with no decoding or case folding. The cache never derives
//! anything itself; the admission pipeline populates it on a miss.
//!
//! The cache is owned by one worker and takes `&mut self` for inserts. A
//! deployment that shares it across workers has to wrap it in a lock.
//! Entries live for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use crate::observability::metrics;
use crate::options::schema::PoolOptions;

/// Shared options snapshot.
pub type SharedOptions = Arc<PoolOptions>;

/// App group name → options snapshot.
#[derive(Debug, Default)]
pub struct OptionsCache {
    inner: HashMap<Box<[u8]>, SharedOptions>,
}

impl OptionsCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding the single application of single-app mode.
    pub fn single_app(options: PoolOptions) -> Self {
        let mut cache = Self::new();
        let name = options.app_group_name.as_bytes().into();
        cache.insert(name, Arc::new(options));
        cache
    }

    /// Look up the snapshot for `app_group_name`.
    pub fn lookup(&self, app_group_name: &[u8]) -> Option<SharedOptions> {
        let found = self.inner.get(app_group_name).cloned();
        metrics::record_options_cache(found.is_some());
        found
    }

    /// Return the only entry. `None` unless exactly one entry exists.
    pub fn lookup_sole(&self) -> Option<SharedOptions> {
        if self.inner.len() != 1 {
            return None;
        }
        self.inner.values().next().cloned()
    }

    /// Store a snapshot, replacing any previous one for the same name.
    pub fn insert(&mut self, app_group_name: Box<[u8]>, options: SharedOptions) {
        tracing::debug!(app_group = %options.app_group_name, "Caching pool options");
        self.inner.insert(app_group_name, options);
        metrics::record_options_cache_size(self.inner.len());
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
