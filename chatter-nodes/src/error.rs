//!
//! Errors surfaced by nodes.
//!

use thiserror::Error;

use chatter_executors::{Interrupted, RateError};
use chatter_publishers_and_subscribers::LocalError;

/// An error from initializing, running or shutting down a node
#[derive(Debug, Error)]
pub enum ChatterError {
    /// The node was asked to shut down while sleeping or publishing
    #[error("node interrupted by shutdown")]
    InterruptedShutdown,
    /// A topic could not be advertised or subscribed to
    #[error(transparent)]
    Topic(LocalError),
    /// A configuration value was rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The Ctrl-C handler could not be installed
    #[error("failed to install the Ctrl-C handler")]
    SignalHandler(#[from] ctrlc::Error),
}

impl From<LocalError> for ChatterError {
    fn from(err: LocalError) -> Self {
        match err {
            LocalError::Closed => Self::InterruptedShutdown,
            err => Self::Topic(err),
        }
    }
}

impl From<Interrupted> for ChatterError {
    fn from(_: Interrupted) -> Self {
        Self::InterruptedShutdown
    }
}

impl From<RateError> for ChatterError {
    fn from(err: RateError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
