use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use tokio::runtime::Handle;
use url::Url;

use super::operation::{InFlightOperation, Waiter};
use super::transport::{ProgressSink, Transport};
use crate::error::{LoadError, TransportFailure};
use crate::resource::{CacheKey, ResourceDescriptor};

/// Turns the transport outcome into the value shared with every waiter.
///
/// Runs once per operation on the blocking pool, after the download slot has
/// been released.
pub type Finalize<T> =
    Box<dyn FnOnce(Result<PathBuf, TransportFailure>) -> Result<T, LoadError> + Send>;

/// Whether a call created a new download or joined an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Started,
    Joined,
}

struct Job<T> {
    key: CacheKey,
    url: Url,
    destination: PathBuf,
    finalize: Finalize<T>,
}

struct Registry<T> {
    operations: HashMap<CacheKey, InFlightOperation<T>>,
    queue: VecDeque<Job<T>>,
    active: usize,
}

struct Shared<T> {
    registry: Mutex<Registry<T>>,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    max_active: usize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of in-flight downloads.
///
/// At most one download exists per [`CacheKey`]; later requests for the same
/// key join it. At most `max_active` transport fetches run at once, the rest
/// wait in submission order.
pub struct DownloadCoordinator<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for DownloadCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> DownloadCoordinator<T>
where
    T: Clone + Send + 'static,
{
    /// `max_active` is clamped to at least one.
    pub fn new(transport: Arc<dyn Transport>, max_active: usize, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry {
                    operations: HashMap::new(),
                    queue: VecDeque::new(),
                    active: 0,
                }),
                transport,
                runtime,
                max_active: max_active.max(1),
            }),
        }
    }

    /// Join the download for `descriptor`, or start one writing to
    /// `destination`.
    ///
    /// `finalize` is only used when a new download is started; a joining
    /// caller shares the value produced by the first caller's finalize.
    pub fn start_or_join<F>(
        &self,
        descriptor: &ResourceDescriptor,
        destination: PathBuf,
        waiter: Waiter<T>,
        finalize: F,
    ) -> Admission
    where
        F: FnOnce(Result<PathBuf, TransportFailure>) -> Result<T, LoadError> + Send + 'static,
    {
        let key = descriptor.key();
        let mut registry = self.shared.lock();

        if let Some(operation) = registry.operations.get_mut(key) {
            operation.join(waiter);
            debug!(
                "joined download of {} ({} waiters)",
                descriptor,
                operation.waiter_count()
            );
            return Admission::Joined;
        }

        registry
            .operations
            .insert(key.clone(), InFlightOperation::new(key.clone(), waiter));
        let job = Job {
            key: key.clone(),
            url: descriptor.url().clone(),
            destination,
            finalize: Box::new(finalize),
        };

        if registry.active < self.shared.max_active {
            registry.active += 1;
            debug!("dispatching download of {}", descriptor);
            spawn_job(&self.shared, job);
        } else {
            registry.queue.push_back(job);
            debug!(
                "queued download of {} ({} waiting for a slot)",
                descriptor,
                registry.queue.len()
            );
        }
        Admission::Started
    }

    /// Number of downloads that have not reached a terminal state.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().operations.len()
    }

    pub fn is_in_flight(&self, key: &CacheKey) -> bool {
        self.shared.lock().operations.contains_key(key)
    }

    /// Number of transport fetches currently running.
    pub fn active(&self) -> usize {
        self.shared.lock().active
    }

    /// Number of downloads waiting for a slot.
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn waiter_count(&self, key: &CacheKey) -> usize {
        self.shared
            .lock()
            .operations
            .get(key)
            .map_or(0, InFlightOperation::waiter_count)
    }

    /// Last progress reported for `key`, if a download is in flight.
    pub fn progress(&self, key: &CacheKey) -> Option<f32> {
        self.shared
            .lock()
            .operations
            .get(key)
            .map(InFlightOperation::progress)
    }
}

fn spawn_job<T>(shared: &Arc<Shared<T>>, job: Job<T>)
where
    T: Clone + Send + 'static,
{
    let task = run_job(Arc::clone(shared), job);
    shared.runtime.spawn(task);
}

async fn run_job<T>(shared: Arc<Shared<T>>, job: Job<T>)
where
    T: Clone + Send + 'static,
{
    let Job {
        key,
        url,
        destination,
        finalize,
    } = job;

    let progress = {
        let shared = Arc::clone(&shared);
        let key = key.clone();
        ProgressSink::new(move |fraction| report_progress(&shared, &key, fraction))
    };

    // Own task so a panicking transport surfaces as a JoinError.
    let fetch = {
        let transport = Arc::clone(&shared.transport);
        let url = url.clone();
        shared
            .runtime
            .spawn(async move { transport.fetch(&url, &destination, progress).await })
    };
    let fetched = match fetch.await {
        Ok(fetched) => fetched,
        Err(e) => Err(TransportFailure::system(format!("transport task failed: {e}"))),
    };
    if let Err(e) = &fetched {
        warn!("download of {} failed: {}", url, e);
    }

    release_slot(&shared);

    let outcome = match shared.runtime.spawn_blocking(move || finalize(fetched)).await {
        Ok(outcome) => outcome,
        Err(e) => Err(LoadError::Decode(format!("finalize task failed: {e}"))),
    };

    complete(&shared, &key, outcome);
}

fn report_progress<T: Clone>(shared: &Shared<T>, key: &CacheKey, fraction: f32) {
    let mut registry = shared.lock();
    match registry.operations.get_mut(key) {
        Some(operation) => operation.report(fraction),
        None => debug!("dropping progress for {} with no download in flight", key),
    }
}

/// Hand the freed slot to the oldest queued job, or give it back.
fn release_slot<T>(shared: &Arc<Shared<T>>)
where
    T: Clone + Send + 'static,
{
    let mut registry = shared.lock();
    match registry.queue.pop_front() {
        Some(next) => {
            debug!("dispatching queued download of {}", next.url);
            spawn_job(shared, next);
        }
        None => registry.active -= 1,
    }
}

fn complete<T: Clone>(shared: &Shared<T>, key: &CacheKey, outcome: Result<T, LoadError>) {
    let mut registry = shared.lock();
    match registry.operations.remove(key) {
        Some(operation) => {
            let state = operation.finish(outcome);
            info!("download {} finished: {:?}", key, state);
        }
        None => warn!("completion for {} with no download in flight", key),
    }
}
