//! Download coordination
//!
//! - `transport.rs` - the injected [`Transport`] capability and progress sink
//! - `operation.rs` - one in-flight download and its waiters
//! - `coordinator.rs` - the registry: de-duplication, concurrency ceiling, fan-out
//!
//! The registry is the only shared mutable state here. Every mutation (create,
//! join, progress, completion) happens under a single lock.

mod coordinator;
mod operation;
mod transport;

pub use coordinator::{Admission, DownloadCoordinator, Finalize};
pub use operation::{OperationState, Waiter};
pub use transport::{LocalFileTransport, ProgressSink, Transport};
