//! Two-tier image cache
//!
//! - Memory tier: bounded LRU of decoded images, best effort
//! - Disk tier: `<cache_root>/<digest>.<ext>`, one file per resource
//!
//! Lookups check memory first. A disk hit is decoded and warms the memory
//! tier. Downloads land in `<digest>.<ext>.part` and are renamed into place
//! once they decode. Disk files are never evicted here.

mod disk;
mod memory;

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::decode::{self, DecodeError, DecodedImage};
use crate::resource::{CacheKey, ResourceDescriptor};

use disk::DiskTier;
use memory::MemoryTier;

/// The memory and disk tiers behind one interface.
pub struct CacheStore {
    memory: MemoryTier,
    disk: DiskTier,
}

impl CacheStore {
    /// `root` is assumed to exist and be writable.
    pub fn new(root: impl Into<PathBuf>, memory_capacity: NonZeroUsize) -> Self {
        Self {
            memory: MemoryTier::new(memory_capacity),
            disk: DiskTier::new(root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        self.disk.root()
    }

    /// Final location of the bytes for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.disk.path_for(key)
    }

    /// Where the transport should write the bytes for `key`. Never read by
    /// lookups.
    pub fn staging_path_for(&self, key: &CacheKey) -> PathBuf {
        self.disk.staging_path_for(key)
    }

    /// Remove whatever a failed download left in the staging file.
    pub fn discard_staged(&self, key: &CacheKey) {
        self.disk.discard(&self.disk.staging_path_for(key));
    }

    /// Memory tier only. Never touches the disk.
    pub fn memory(&self, key: &CacheKey) -> Option<Arc<DecodedImage>> {
        self.memory.get(key)
    }

    /// Disk tier only, warming the memory tier on a hit.
    ///
    /// Blocking: reads and decodes a file.
    pub fn load_from_disk(&self, descriptor: &ResourceDescriptor) -> Option<Arc<DecodedImage>> {
        let key = descriptor.key();
        let image = Arc::new(self.disk.read(key, descriptor.kind())?);
        debug!("disk hit for {}", descriptor);
        self.memory.insert(key.clone(), Arc::clone(&image));
        Some(image)
    }

    /// Memory, then disk.
    ///
    /// Blocking on a memory miss.
    pub fn lookup(&self, descriptor: &ResourceDescriptor) -> Option<Arc<DecodedImage>> {
        if let Some(image) = self.memory(descriptor.key()) {
            debug!("memory hit for {}", descriptor);
            return Some(image);
        }
        self.load_from_disk(descriptor)
    }

    /// Insert or overwrite the memory entry for `key`.
    pub fn store(&self, key: CacheKey, image: Arc<DecodedImage>) {
        self.memory.insert(key, image);
    }

    /// Decode a freshly downloaded file, move it to its final name and store
    /// the result.
    ///
    /// On failure the staged file is removed and nothing is cached. Blocking.
    pub fn materialize(
        &self,
        descriptor: &ResourceDescriptor,
        staged: &Path,
    ) -> Result<Arc<DecodedImage>, DecodeError> {
        let committed = decode::decode(staged, descriptor.kind()).and_then(|image| {
            self.disk.commit(staged, descriptor.key())?;
            Ok(image)
        });
        match committed {
            Ok(image) => {
                let image = Arc::new(image);
                self.store(descriptor.key().clone(), Arc::clone(&image));
                Ok(image)
            }
            Err(e) => {
                warn!("failed to cache {}: {}", descriptor, e);
                self.disk.discard(staged);
                Err(e)
            }
        }
    }

    pub fn contains_in_memory(&self, key: &CacheKey) -> bool {
        self.memory.contains(key)
    }

    /// Drop one memory entry. Returns whether it was present.
    pub fn evict(&self, key: &CacheKey) -> bool {
        self.memory.remove(key)
    }

    /// Drop every memory entry, e.g. under memory pressure. Disk is untouched.
    pub fn trim_memory(&self) {
        self.memory.clear();
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn store(dir: &Path, capacity: usize) -> CacheStore {
        CacheStore::new(dir, NonZeroUsize::new(capacity).unwrap())
    }

    fn descriptor(url: &str) -> ResourceDescriptor {
        ResourceDescriptor::parse(url).unwrap()
    }

    #[test]
    fn miss_in_both_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(dir.path(), 4);
        assert!(cache.lookup(&descriptor("https://example.com/a.png")).is_none());
        assert_eq!(cache.memory_len(), 0);
    }

    #[test]
    fn disk_hit_warms_memory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(dir.path(), 4);
        let d = descriptor("https://example.com/a.png");
        std::fs::write(cache.path_for(d.key()), testing::png_bytes(3, 3)).unwrap();

        assert!(!cache.contains_in_memory(d.key()));
        let image = cache.lookup(&d).unwrap();
        assert_eq!(image.width(), 3);
        assert!(cache.contains_in_memory(d.key()));

        // Served from memory even once the file is gone.
        std::fs::remove_file(cache.path_for(d.key())).unwrap();
        assert!(Arc::ptr_eq(&cache.lookup(&d).unwrap(), &image));
    }

    #[test]
    fn memory_hit_never_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(dir.path(), 4);
        let d = descriptor("https://example.com/a.png");
        std::fs::write(cache.path_for(d.key()), testing::png_bytes(9, 9)).unwrap();

        let in_memory = Arc::new(DecodedImage::Still(image::DynamicImage::new_rgba8(1, 1)));
        cache.store(d.key().clone(), Arc::clone(&in_memory));
        assert!(Arc::ptr_eq(&cache.lookup(&d).unwrap(), &in_memory));
    }

    #[test]
    fn corrupt_disk_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(dir.path(), 4);
        let d = descriptor("https://example.com/a.png");
        std::fs::write(cache.path_for(d.key()), b"garbage").unwrap();

        assert!(cache.lookup(&d).is_none());
        assert!(!cache.contains_in_memory(d.key()));
    }

    #[test]
    fn memory_tier_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(dir.path(), 2);
        let img = Arc::new(DecodedImage::Still(image::DynamicImage::new_rgba8(1, 1)));
        let keys: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| descriptor(&format!("https://example.com/{n}.png")).key().clone())
            .collect();
        for key in &keys {
            cache.store(key.clone(), Arc::clone(&img));
        }
        assert_eq!(cache.memory_len(), 2);
        assert!(!cache.contains_in_memory(&keys[0]));
        assert!(cache.contains_in_memory(&keys[2]));

        assert!(cache.evict(&keys[2]));
        assert!(!cache.evict(&keys[2]));
        cache.trim_memory();
        assert_eq!(cache.memory_len(), 0);
    }

    #[test]
    fn materialize_commits_or_discards() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(dir.path(), 4);

        let good = descriptor("https://example.com/anim.gif");
        let staged = cache.staging_path_for(good.key());
        std::fs::write(&staged, testing::gif_bytes(&[100, 100])).unwrap();
        let image = cache.materialize(&good, &staged).unwrap();
        assert_eq!(image.frame_count(), 2);
        assert!(cache.contains_in_memory(good.key()));
        assert!(!staged.exists());
        assert!(cache.path_for(good.key()).is_file());

        let bad = descriptor("https://example.com/bad.png");
        let staged = cache.staging_path_for(bad.key());
        std::fs::write(&staged, b"not an image").unwrap();
        assert!(cache.materialize(&bad, &staged).is_err());
        assert!(!staged.exists());
        assert!(!cache.path_for(bad.key()).exists());
        assert!(!cache.contains_in_memory(bad.key()));
    }

    #[test]
    fn staged_files_are_invisible_to_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = store(dir.path(), 4);
        let d = descriptor("https://example.com/loop.gif");
        let staged = cache.staging_path_for(d.key());
        assert_ne!(staged, cache.path_for(d.key()));

        let gif = testing::gif_bytes(&[100, 200, 150]);
        std::fs::write(&staged, &gif[..gif.len() / 2]).unwrap();
        assert!(cache.lookup(&d).is_none());

        cache.discard_staged(d.key());
        assert!(!staged.exists());
        // Nothing left to discard is fine.
        cache.discard_staged(d.key());
    }
}
