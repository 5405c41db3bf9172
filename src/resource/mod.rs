//! Resource identity
//!
//! A [`ResourceDescriptor`] is built per request from a URL. It carries the
//! declared [`ResourceKind`] (inferred from the path extension) and the
//! [`CacheKey`] that names the resource in both cache tiers.

mod descriptor;
mod key;

pub use descriptor::{ResourceDescriptor, ResourceKind};
pub use key::CacheKey;
