//! Asynchronous image loading with a memory + disk cache.
//!
//! A load checks the memory tier, then the disk tier, and only then asks the
//! injected [`Transport`] to fetch the resource. Concurrent loads of the same
//! URL share one download, and at most a configured number of downloads run
//! at once.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use imgcache::{ImageLoader, LoaderConfig, LocalFileTransport, LoadResult};
//!
//! let loader = ImageLoader::new(LoaderConfig::default(), Arc::new(LocalFileTransport::new()))?;
//! match loader.load_url("file:///tmp/cat.gif", None)?.outcome().await {
//!     LoadResult::Success(image) => println!("{} frame(s)", image.frame_count()),
//!     LoadResult::Failure(err) => eprintln!("{err}"),
//!     LoadResult::Underway(_) => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod decode;
pub mod download;
pub mod error;
pub mod loader;
pub mod resource;

#[cfg(test)]
mod testing;

pub use cache::CacheStore;
pub use config::LoaderConfig;
pub use decode::{AnimatedImage, AnimationFrame, DecodeError, DecodedImage};
pub use download::{DownloadCoordinator, LocalFileTransport, ProgressSink, Transport};
pub use error::{ConfigError, LoadError, TransportFailure};
pub use loader::{ImageLoader, LoadEvent, LoadHandle, LoadResult, ResultSink};
pub use resource::{CacheKey, ResourceDescriptor, ResourceKind};
