//!
//! # Chatter
//!
//! Chatter is a small node-based publish/subscribe framework built around
//! the classic talker/listener pair: one node publishes a timestamped
//! string on a topic at a fixed rate and listens to that same topic,
//! printing every message it hears.
//!
//! ## Technical Overview
//!
//! A unit of work is a Node.  Nodes report an update delay and the
//! executor calls their `update` method once per delay.  Between updates
//! the executor sleeps on an interrupt channel, so a shutdown wakes it
//! immediately and no further update runs.
//!
//! Publishers and subscribers are handed out by a `NodeHandle` from a topic
//! name.  Polling subscribers hold the latest value for their node to read,
//! while callback subscribers have their handler invoked by the topic's
//! dispatch pool for every message.
//!
//! ```no_run
//! use chatter::prelude::*;
//!
//! let node = NodeHandle::init(NodeOptions::default())?;
//! node.install_ctrlc_handler()?;
//!
//! match talker_listener(&node, &TalkerListenerOptions::default()) {
//!     Ok(()) | Err(ChatterError::InterruptedShutdown) => {}
//!     Err(err) => return Err(err),
//! }
//! # Ok::<(), ChatterError>(())
//! ```
//!

pub mod prelude;

/// Chatter Core Traits
pub use chatter_core as core;
/// Chatter Executors
pub use chatter_executors as executors;
/// Chatter Node Lifecycle and Nodes
pub use chatter_nodes as nodes;
/// Chatter Publishers and Subscribers
pub use chatter_publishers_and_subscribers as pubsubs;
