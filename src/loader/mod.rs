//! Public entry point
//!
//! [`ImageLoader`] ties the pieces together:
//! 1. memory tier (synchronous, on the caller's thread)
//! 2. disk tier (blocking pool)
//! 3. download coordinator, with an optional placeholder signal first
//! 4. decode + write-back, shared by every caller of the same resource
//!
//! Loads are fire-and-forget. Results arrive through a [`LoadHandle`], through
//! callbacks, or through a [`ResultSink`].

mod handle;
mod sink;

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

use crate::cache::CacheStore;
use crate::config::LoaderConfig;
use crate::decode::DecodedImage;
use crate::download::{DownloadCoordinator, Transport, Waiter};
use crate::error::{ConfigError, LoadError, TransportFailure};
use crate::resource::ResourceDescriptor;

pub use handle::{LoadEvent, LoadHandle, LoadResult};
pub use sink::ResultSink;

use sink::Callbacks;

/// Loads images through the memory tier, the disk tier and the network,
/// never downloading the same resource twice at the same time.
///
/// Cloning is cheap; clones share caches and the download registry.
#[derive(Clone)]
pub struct ImageLoader {
    config: Arc<LoaderConfig>,
    cache: Arc<CacheStore>,
    downloads: DownloadCoordinator<Arc<DecodedImage>>,
    runtime: Handle,
}

impl ImageLoader {
    /// Create a loader on the current Tokio runtime.
    pub fn new(config: LoaderConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Self::with_runtime(config, transport, runtime)
    }

    /// Create a loader that spawns its work on `runtime`. Creates the cache
    /// root if needed.
    pub fn with_runtime(
        config: LoaderConfig,
        transport: Arc<dyn Transport>,
        runtime: Handle,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        config.ensure_cache_root()?;
        let cache = CacheStore::new(config.cache_root.clone(), config.memory_capacity()?);
        let downloads =
            DownloadCoordinator::new(transport, config.max_concurrent_downloads, runtime.clone());

        info!(
            "image loader ready: cache at {}, {} download slot(s)",
            config.cache_root.display(),
            config.max_concurrent_downloads
        );

        Ok(Self {
            config: Arc::new(config),
            cache: Arc::new(cache),
            downloads,
            runtime,
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn downloads(&self) -> &DownloadCoordinator<Arc<DecodedImage>> {
        &self.downloads
    }

    /// Parse `url` and load it. Fails immediately, before any cache or
    /// network work, if the URL is invalid.
    pub fn load_url(
        &self,
        url: &str,
        placeholder: Option<Arc<DecodedImage>>,
    ) -> Result<LoadHandle, LoadError> {
        let descriptor = ResourceDescriptor::parse(url)?;
        Ok(self.load(descriptor, placeholder))
    }

    /// Load `descriptor`.
    ///
    /// A memory hit is delivered before this returns. Otherwise the disk tier
    /// is checked in the background, unless a download for the resource is
    /// already in flight. On a miss `Underway(placeholder)` is emitted (when a
    /// placeholder was given) before the download is started or joined.
    pub fn load(
        &self,
        descriptor: ResourceDescriptor,
        placeholder: Option<Arc<DecodedImage>>,
    ) -> LoadHandle {
        let (events, handle) = LoadHandle::channel();

        if let Some(image) = self.cache.memory(descriptor.key()) {
            debug!("memory hit for {}", descriptor);
            let _ = events.send(LoadEvent::Result(LoadResult::Success(image)));
            return handle;
        }

        let loader = self.clone();
        self.runtime.spawn(async move {
            let disk_hit = if loader.downloads.is_in_flight(descriptor.key()) {
                debug!("{} is downloading, skipping disk", descriptor);
                None
            } else {
                let cache = Arc::clone(&loader.cache);
                let descriptor = descriptor.clone();
                loader
                    .runtime
                    .spawn_blocking(move || cache.load_from_disk(&descriptor))
                    .await
                    .ok()
                    .flatten()
            };
            if let Some(image) = disk_hit {
                let _ = events.send(LoadEvent::Result(LoadResult::Success(image)));
                return;
            }

            if placeholder.is_some() {
                let _ = events.send(LoadEvent::Result(LoadResult::Underway(placeholder)));
            }
            loader.fetch(descriptor, events);
        });

        handle
    }

    /// Callback form of [`load`](Self::load). `on_result` sees the optional
    /// `Underway` signal and then exactly one terminal result.
    pub fn load_with<P, R>(
        &self,
        descriptor: ResourceDescriptor,
        placeholder: Option<Arc<DecodedImage>>,
        on_progress: P,
        on_result: R,
    ) where
        P: FnMut(f32) + Send + 'static,
        R: FnMut(LoadResult) + Send + 'static,
    {
        self.load_into(
            descriptor,
            placeholder,
            Callbacks {
                on_progress,
                on_result,
            },
        );
    }

    /// Load `descriptor` and feed every event to `sink`.
    pub fn load_into<S: ResultSink>(
        &self,
        descriptor: ResourceDescriptor,
        placeholder: Option<Arc<DecodedImage>>,
        mut sink: S,
    ) {
        let mut handle = self.load(descriptor, placeholder);
        self.runtime.spawn(async move {
            let mut finished = false;
            while let Some(event) = handle.next().await {
                match event {
                    LoadEvent::Progress(fraction) => sink.apply_progress(fraction),
                    LoadEvent::Result(result) => {
                        finished |= result.is_terminal();
                        sink.apply_result(result);
                    }
                }
            }
            if !finished {
                sink.apply_result(LoadResult::Failure(LoadError::Shutdown));
            }
        });
    }

    /// Start or join the download, decoding and caching on success.
    fn fetch(&self, descriptor: ResourceDescriptor, events: UnboundedSender<LoadEvent>) {
        let progress_events = events.clone();
        let waiter = Waiter::new(
            move |fraction| {
                let _ = progress_events.send(LoadEvent::Progress(fraction));
            },
            move |outcome: Result<Arc<DecodedImage>, LoadError>| {
                let _ = events.send(LoadEvent::Result(LoadResult::from(outcome)));
            },
        );

        let destination = self.cache.staging_path_for(descriptor.key());
        let cache = Arc::clone(&self.cache);
        let target = descriptor.clone();
        let finalize = move |fetched: Result<PathBuf, TransportFailure>| match fetched {
            Ok(staged) => cache.materialize(&target, &staged).map_err(LoadError::from),
            Err(failure) => {
                cache.discard_staged(target.key());
                Err(LoadError::from(failure))
            }
        };

        self.downloads
            .start_or_join(&descriptor, destination, waiter, finalize);
    }
}
