use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::decode::DecodedImage;
use crate::resource::CacheKey;

/// Bounded in-process tier. Least recently used entries go first once the
/// capacity is reached; every operation is a single point update.
pub(super) struct MemoryTier {
    entries: Mutex<LruCache<CacheKey, Arc<DecodedImage>>>,
}

impl MemoryTier {
    pub(super) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<DecodedImage>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn get(&self, key: &CacheKey) -> Option<Arc<DecodedImage>> {
        self.lock().get(key).cloned()
    }

    pub(super) fn insert(&self, key: CacheKey, image: Arc<DecodedImage>) {
        self.lock().put(key, image);
    }

    pub(super) fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    pub(super) fn remove(&self, key: &CacheKey) -> bool {
        self.lock().pop(key).is_some()
    }

    pub(super) fn clear(&self) {
        self.lock().clear();
    }

    pub(super) fn len(&self) -> usize {
        self.lock().len()
    }
}
