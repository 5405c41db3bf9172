use std::fmt;

use url::Url;

use super::CacheKey;
use crate::error::LoadError;

/// Longest extension kept in a cache file name.
const MAX_EXTENSION_LEN: usize = 8;

/// How a resource is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Single-frame raster image (PNG, JPEG, ...).
    Still,
    /// Multi-frame animation assembled from per-frame delays.
    Animated,
}

impl ResourceKind {
    /// Infer the kind from a path extension. Unknown or empty extensions are
    /// treated as still images; the file content is never sniffed here.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "gif" | "apng" => ResourceKind::Animated,
            _ => ResourceKind::Still,
        }
    }
}

/// A fetchable, cacheable image: the URL plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    url: Url,
    extension: String,
    kind: ResourceKind,
    key: CacheKey,
}

impl ResourceDescriptor {
    /// Parse `url` and derive its kind and cache key.
    pub fn parse(url: &str) -> Result<Self, LoadError> {
        let parsed = Url::parse(url).map_err(|e| LoadError::InvalidResource {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_url(parsed))
    }

    pub fn from_url(url: Url) -> Self {
        let extension = path_extension(&url);
        let kind = ResourceKind::from_extension(&extension);
        let key = CacheKey::derive(&url, &extension);
        Self {
            url,
            extension,
            kind,
            key,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The sanitized extension of the last path segment, possibly empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Extension of the URL's last path segment.
///
/// Query and fragment never contribute. Anything that is not a short ASCII
/// alphanumeric run is dropped so it can safely end up in a file name.
fn path_extension(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_string()
        }
        _ => String::new(),
    }
}
