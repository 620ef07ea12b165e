//!
//! Chatter-Core is the collection of traits that lay out the core of the
//! chatter talker/listener framework.
//!

#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod node;
pub use node::Node;

pub mod executor;
pub use executor::{Executor, ExecutorState};

pub mod publisher_subscriber;
pub use publisher_subscriber::{Publisher, Subscriber};
