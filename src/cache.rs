//! Process-wide memoization of derived models.
//!
//! Equal requests must yield the identical [`ModelRef`], not a structurally
//! equal copy, because callers compare and register models by identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::ReentrantMutex;
use tracing::debug;

use crate::error::SynthesisError;
use crate::model::ModelRef;

/// (base identity, selectors in call order, recursive flag)
type CacheKey = (usize, Vec<String>, bool);

struct CacheEntry {
    // Pins the base so its identity cannot be reused by another model.
    _base: ModelRef,
    derived: ModelRef,
}

/// Thread-safe derivation cache. Entries are never evicted.
///
/// Entries are keyed without the model factory that built them; use one
/// cache per factory.
///
/// A single re-entrant lock is held for the whole lookup-derive-insert
/// sequence: derivations are serialized across threads, and nested
/// derivations on the same thread re-enter the lock.
pub struct DerivationCache {
    entries: ReentrantMutex<RefCell<HashMap<CacheKey, CacheEntry>>>,
}

static GLOBAL: OnceLock<DerivationCache> = OnceLock::new();

impl Default for DerivationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DerivationCache {
    pub fn new() -> Self {
        Self {
            entries: ReentrantMutex::new(RefCell::new(HashMap::new())),
        }
    }

    /// The cache shared by [`partial_model`](crate::partial_model) and
    /// [`PartialModel::as_partial`](crate::PartialModel::as_partial).
    pub fn global() -> &'static DerivationCache {
        GLOBAL.get_or_init(DerivationCache::new)
    }

    /// Look up a previously derived model.
    pub fn get(&self, base: &ModelRef, selectors: &[String], recursive: bool) -> Option<ModelRef> {
        let guard = self.entries.lock();
        let entries = guard.borrow();
        entries
            .get(&(base.id(), selectors.to_vec(), recursive))
            .map(|entry| entry.derived.clone())
    }

    /// Return the cached model for the key, or run `derive` and remember its
    /// result. Errors are returned without being cached.
    pub fn get_or_derive<F>(
        &self,
        base: &ModelRef,
        selectors: &[String],
        recursive: bool,
        derive: F,
    ) -> Result<ModelRef, SynthesisError>
    where
        F: FnOnce() -> Result<ModelRef, SynthesisError>,
    {
        let key: CacheKey = (base.id(), selectors.to_vec(), recursive);
        let guard = self.entries.lock();

        if let Some(entry) = guard.borrow().get(&key) {
            debug!(model = base.name(), ?selectors, recursive, "partial model cache hit");
            return Ok(entry.derived.clone());
        }

        // The RefCell borrow must not be held here: `derive` re-enters the
        // cache for nested models.
        let derived = derive()?;

        let mut entries = guard.borrow_mut();
        let entry = entries.entry(key).or_insert_with(|| CacheEntry {
            _base: base.clone(),
            derived,
        });
        Ok(entry.derived.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
