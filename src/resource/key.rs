//! Cache key derivation.
//!
//! The key is a SHA-256 digest of the absolute URL string, so the same URL
//! names the same file across process runs.

use std::fmt;

use sha2::{Digest, Sha256};
use url::Url;

/// Stable identity of a cacheable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
    extension: String,
}

impl CacheKey {
    /// Derive the key for `url`. `extension` is the already sanitized path
    /// extension (possibly empty).
    pub fn derive(url: &Url, extension: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        Self {
            digest: hex::encode(hasher.finalize()),
            extension: extension.to_string(),
        }
    }

    /// Lowercase hex digest of the URL.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Name of the file holding this resource in the disk tier.
    ///
    /// `<digest>.<extension>`, or just `<digest>` when the URL had no usable
    /// extension.
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.digest.clone()
        } else {
            format!("{}.{}", self.digest, self.extension)
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}
