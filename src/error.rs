//! Error types surfaced by the loader.
//!
//! `LoadError` is what every waiter ultimately sees. It is `Clone` because a
//! single download outcome is fanned out to every caller that joined it.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Terminal failure of a load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The URL could not be parsed. Raised before any cache or network work.
    #[error("invalid resource `{url}`: {reason}")]
    InvalidResource { url: String, reason: String },

    /// The transport reported a network or system failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A caller or domain supplied failure reason.
    #[error("{0}")]
    Application(String),

    /// The downloaded (or cached) bytes could not be turned into an image.
    #[error("decode error: {0}")]
    Decode(String),

    /// The runtime dropped the load before it reached a terminal state.
    #[error("loader shut down before the load completed")]
    Shutdown,
}

impl LoadError {
    /// Human-readable description, suitable for showing to a user.
    pub fn domain(&self) -> String {
        self.to_string()
    }
}

/// Failure reported by a [`Transport`](crate::download::Transport).
#[derive(Debug, Error)]
pub enum TransportFailure {
    /// Underlying network or system failure.
    #[error("{0}")]
    System(Box<dyn StdError + Send + Sync>),

    /// Transport-specific reason, e.g. an unexpected HTTP status.
    #[error("{0}")]
    Custom(String),
}

impl TransportFailure {
    pub fn system<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        TransportFailure::System(err.into())
    }

    pub fn custom(reason: impl fmt::Display) -> Self {
        TransportFailure::Custom(reason.to_string())
    }
}

impl From<std::io::Error> for TransportFailure {
    fn from(err: std::io::Error) -> Self {
        TransportFailure::System(Box::new(err))
    }
}

impl From<TransportFailure> for LoadError {
    fn from(failure: TransportFailure) -> Self {
        match failure {
            TransportFailure::System(err) => LoadError::Transport(err.to_string()),
            TransportFailure::Custom(reason) => LoadError::Application(reason),
        }
    }
}

/// Invalid loader configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_concurrent_downloads must be at least 1")]
    NoDownloadSlots,

    #[error("memory_capacity must be at least 1")]
    NoMemoryCapacity,

    #[error("image loader must be created inside a Tokio runtime")]
    NoRuntime,

    #[error("failed to parse loader configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_failure_maps_to_transport_error() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out");
        let err = LoadError::from(TransportFailure::from(io));
        assert_eq!(err, LoadError::Transport("connection timed out".to_string()));
        assert_eq!(err.domain(), "transport error: connection timed out");
    }

    #[test]
    fn custom_failure_keeps_reason_verbatim() {
        let err = LoadError::from(TransportFailure::custom("HTTP 404"));
        assert_eq!(err, LoadError::Application("HTTP 404".to_string()));
        assert_eq!(err.domain(), "HTTP 404");
    }
}
