//!
//! Node lifecycle and the talker/listener nodes.
//!
//! A `NodeHandle` is the scoped registration of a node: it owns the node's
//! name, clock, topics and shutdown signal, and shuts all of them down when
//! it is dropped.  The talker/listener module builds the periodic publish
//! loop and the printing receive callback on top of it.
//!

#![deny(missing_docs)]

pub mod clock;
pub use clock::NodeClock;

pub mod error;
pub use error::ChatterError;

pub mod handle;
pub use handle::{NodeHandle, NodeOptions};

pub mod shutdown;
pub use shutdown::ShutdownSignal;

pub mod talker_listener;
pub use talker_listener::{Talker, TalkerListenerOptions};
