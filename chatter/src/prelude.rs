//!
//! The types most programs need, in one import.
//!

pub use chatter_core::{Executor, ExecutorState, Node, Publisher, Subscriber};
pub use chatter_executors::{Rate, SimpleExecutor};
pub use chatter_nodes::{
    talker_listener::{listener, listener_to, talker_listener},
    ChatterError, NodeHandle, NodeOptions, Talker, TalkerListenerOptions,
};
pub use chatter_publishers_and_subscribers::{
    LocalCallbackSubscriber, LocalPublisher, LocalSubscriber,
};
