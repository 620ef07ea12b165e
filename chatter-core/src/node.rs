//!
//! A Singular Unit of Work.
//!
//! In Chatter, Nodes are an individual unit of work that is performed
//! every x microseconds.  A talker that publishes once per tick is a Node
//! whose update delay is the length of its tick.
//!

/// A Node represents a singular process that performs some singular
/// purpose
pub trait Node: Send {
    /// Return the node's update delay (in us)
    fn get_update_delay_us(&self) -> u128;

    /// Complete the necessary setup functionalities for a Node.
    ///
    /// Note: this method is called when the executor is started, before
    /// the first call to update.
    fn start(&mut self) {}

    /// Update is called by the executor every get_update_delay_us microseconds.
    ///
    /// This should include the work completed by this node every "tick".
    fn update(&mut self);

    /// When an executor is stopped or has finished executing nodes, it will call
    /// this method on all of its nodes so this should clean up any work
    /// the node needs to do.
    fn shutdown(&mut self) {}
}
