//! Transport capability
//!
//! The loader never speaks HTTP itself. A [`Transport`] is injected and asked
//! to place the bytes of a URL at a destination path inside the disk tier,
//! reporting progress along the way.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;

use crate::error::TransportFailure;

/// Fetches a remote resource into a file.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Download `url` into `destination`, overwriting any existing file.
    ///
    /// `destination` is a staging file: it may be left partly written on
    /// failure, and the caller moves it into the cache only after a successful
    /// return. On success returns the path the bytes were written to (normally
    /// `destination`). Timeouts are reported as [`TransportFailure::System`].
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: ProgressSink,
    ) -> Result<PathBuf, TransportFailure>;
}

/// Receives download progress as a fraction in `[0, 1]`.
#[derive(Clone)]
pub struct ProgressSink {
    report: Arc<dyn Fn(f32) + Send + Sync>,
}

impl ProgressSink {
    pub fn new(report: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self {
            report: Arc::new(report),
        }
    }

    /// A sink that discards every tick.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Report progress. Values are clamped to `[0, 1]`; NaN is ignored.
    pub fn report(&self, fraction: f32) {
        if fraction.is_nan() {
            return;
        }
        (self.report)(fraction.clamp(0.0, 1.0));
    }

    /// Report `done` out of `total` bytes. Unknown totals are not reported.
    pub fn report_bytes(&self, done: u64, total: u64) {
        if total > 0 {
            self.report(done as f32 / total as f32);
        }
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink").finish_non_exhaustive()
    }
}

/// Serves `file://` URLs by copying the referenced file in chunks.
///
/// Handy for local mirrors and tests; any other scheme is rejected.
#[derive(Debug, Clone)]
pub struct LocalFileTransport {
    chunk_size: usize,
}

impl LocalFileTransport {
    const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

    pub fn new() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for LocalFileTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for LocalFileTransport {
    async fn fetch(
        &self,
        url: &Url,
        destination: &Path,
        progress: ProgressSink,
    ) -> Result<PathBuf, TransportFailure> {
        if url.scheme() != "file" {
            return Err(TransportFailure::custom(format!(
                "unsupported scheme `{}`",
                url.scheme()
            )));
        }
        let source = url
            .to_file_path()
            .map_err(|_| TransportFailure::custom(format!("not a local path: {url}")))?;

        let mut input = File::open(&source).await?;
        let total = input.metadata().await?.len();
        let mut output = File::create(destination).await?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut copied = 0u64;
        loop {
            let n = input.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            output.write_all(&buf[..n]).await?;
            copied += n as u64;
            progress.report_bytes(copied, total);
        }
        output.flush().await?;

        debug!("copied {} bytes from {} to {}", copied, source.display(), destination.display());
        Ok(destination.to_path_buf())
    }
}
