//!
//! Chatter Publishers and Subscribers
//!
//! This crate contains the in-process publishers and their respective
//! subscribers, plus a registry that hands them out by topic name so that
//! sharing data between Nodes is as effortless as naming the topic.
//!

#![deny(missing_docs)]

pub mod local;
pub use local::{LocalCallbackSubscriber, LocalError, LocalPublisher, LocalSubscriber};

pub mod registry;
pub use registry::TopicRegistry;
