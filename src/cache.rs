use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

/// Compiled expressions keyed by their exact source text.
///
/// A capacity of zero disables caching entirely: every lookup compiles.
pub(crate) struct ExpressionCache<C> {
    entries: Mutex<Option<LruCache<String, Arc<C>>>>,
}

impl<C> ExpressionCache<C> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(NonZeroUsize::new(capacity).map(LruCache::new)),
        }
    }

    /// Returns the cached expression for `source`, compiling it on a miss.
    ///
    /// The lock is not held while compiling. When two threads race on the same
    /// source, the first insertion wins and both receive the same `Arc`.
    /// Failed compilations are never stored.
    pub(crate) fn get_or_compile<E, F>(&self, source: &str, compile: F) -> Result<Arc<C>, E>
    where
        F: FnOnce(&str) -> Result<C, E>,
    {
        {
            let mut entries = self.entries.lock();
            if let Some(cache) = entries.as_mut() {
                if let Some(hit) = cache.get(source) {
                    trace!(source, "expression cache hit");
                    return Ok(Arc::clone(hit));
                }
            }
        }

        debug!(source, "compiling expression");
        let compiled = Arc::new(compile(source)?);

        let mut entries = self.entries.lock();
        let Some(cache) = entries.as_mut() else {
            return Ok(compiled);
        };
        if let Some(existing) = cache.get(source) {
            return Ok(Arc::clone(existing));
        }
        if let Some((evicted, _)) = cache.push(source.to_owned(), Arc::clone(&compiled)) {
            debug!(evicted = %evicted, "evicted least recently used expression");
        }
        drop(entries);

        Ok(compiled)
    }

    /// Changes the capacity, evicting least recently used entries if shrinking.
    pub(crate) fn resize(&self, capacity: usize) {
        let mut entries = self.entries.lock();
        let Some(capacity) = NonZeroUsize::new(capacity) else {
            *entries = None;
            return;
        };
        if let Some(cache) = entries.as_mut() {
            cache.resize(capacity);
        } else {
            *entries = Some(LruCache::new(capacity));
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().as_ref().map_or(0, LruCache::len)
    }

    /// Whether `source` is cached, without touching its recency.
    pub(crate) fn contains(&self, source: &str) -> bool {
        self.entries
            .lock()
            .as_ref()
            .is_some_and(|cache| cache.contains(source))
    }

    pub(crate) fn clear(&self) {
        if let Some(cache) = self.entries.lock().as_mut() {
            cache.clear();
        }
    }
}
