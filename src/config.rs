//! Loader configuration
//!
//! An explicit value passed to [`ImageLoader`](crate::ImageLoader) instead of
//! a process-wide default. It round-trips through JSON so applications can
//! keep it next to their other settings.

use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of transport fetches allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 5;

/// Default number of decoded images kept in memory.
pub const DEFAULT_MEMORY_CAPACITY: usize = 128;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory holding one file per cached resource.
    /// - Linux: ~/.cache/imgcache/images
    /// - macOS: ~/Library/Caches/imgcache/images
    pub cache_root: PathBuf,

    /// Ceiling on concurrent transport fetches; further downloads queue FIFO.
    pub max_concurrent_downloads: usize,

    /// Entries kept in the memory tier before the least recently used is dropped.
    pub memory_capacity: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root().unwrap_or_else(|| std::env::temp_dir().join("imgcache")),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl LoaderConfig {
    /// Defaults with an explicit cache directory.
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON. Missing fields take their default.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::NoDownloadSlots);
        }
        if self.memory_capacity == 0 {
            return Err(ConfigError::NoMemoryCapacity);
        }
        Ok(())
    }

    pub(crate) fn memory_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.memory_capacity).ok_or(ConfigError::NoMemoryCapacity)
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure_cache_root(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.cache_root)?;
        Ok(())
    }
}

/// The platform cache directory for this crate, e.g. `~/.cache/imgcache/images`.
pub fn default_cache_root() -> Option<PathBuf> {
    let mut path = dirs_next::cache_dir().or_else(dirs_next::home_dir)?;
    path.push("imgcache");
    path.push("images");
    Some(path)
}
