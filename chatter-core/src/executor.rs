//!
//! An executor handles the scheduling and execution of nodes.
//!
//! Most users should use the executors provided in chatter-executors.
//! This trait gives a common interface to them and allows users to write
//! their own executors if desired.
//!

use crate::node::Node;

/// The current state an executor is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorState {
    /// The nodes in the executor are currently stopped.
    ///
    /// This means the Nodes must be started before update can begin
    Stopped,
    /// The nodes in the executor have been started and can now be updated.
    Started,
    /// The nodes in the executor are currently being updated
    Running,
}

/// An executor handles the scheduling and execution of nodes
pub trait Executor {
    /// Starts the nodes contained by the executor
    fn start(&mut self);

    /// Run the update loop for a set amount of time (in milliseconds)
    fn update_for_ms(&mut self, ms: u128);

    /// Run the update loop until the executor's interrupt is observed
    fn update_loop(&mut self);

    /// Check whether the program has been interrupted
    ///
    /// Note: This should be called between each Node execution
    fn check_interrupt(&mut self) -> bool;

    /// Add a node to the executor.
    fn add_node(&mut self, node: Box<dyn Node>);
}
