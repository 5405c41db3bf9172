use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::decode::{self, DecodedImage};
use crate::resource::{CacheKey, ResourceKind};

/// Appended to the final file name while a download is being written.
const STAGING_SUFFIX: &str = "part";

/// Directory holding one file per resource.
///
/// The transport writes into a staging file next to the final one; only a
/// complete download that decodes is renamed into place, so reads never see
/// a partial file.
pub(super) struct DiskTier {
    root: PathBuf,
}

impl DiskTier {
    pub(super) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(super) fn root(&self) -> &Path {
        &self.root
    }

    pub(super) fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    pub(super) fn staging_path_for(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(format!("{}.{}", key.file_name(), STAGING_SUFFIX))
    }

    /// Move a staged download to its final name and return that path.
    pub(super) fn commit(&self, staged: &Path, key: &CacheKey) -> io::Result<PathBuf> {
        let path = self.path_for(key);
        if staged != path {
            fs::rename(staged, &path)?;
        }
        Ok(path)
    }

    /// Decode the cached file for `key`.
    ///
    /// A missing, unreadable or undecodable file is a miss. The file may
    /// vanish between the existence check and the read; that is a miss too.
    pub(super) fn read(&self, key: &CacheKey, kind: ResourceKind) -> Option<DecodedImage> {
        let path = self.path_for(key);
        if !path.is_file() {
            return None;
        }
        match decode::decode(&path, kind) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!("treating {} as a miss: {}", path.display(), e);
                None
            }
        }
    }

    /// Remove a staged or undecodable file so it cannot shadow the next fetch.
    pub(super) fn discard(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!("removed {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove {}: {}", path.display(), e),
        }
    }
}
