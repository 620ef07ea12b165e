//!
//! Chatter-Executors provides the executors (kind of like schedulers)
//! for nodes along with the rate-limited sleep primitive they are built on.
//!
//! Every executor in this crate owns the receiving end of an interrupt
//! channel.  Sending `true` over the channel, or dropping every sender,
//! interrupts the executor.  Executors never busy wait: between node updates
//! they block on the interrupt channel so an interrupt wakes them at once.
//!

#![deny(missing_docs)]

pub mod simple_executor;
pub use simple_executor::SimpleExecutor;

pub mod rate;
pub use rate::{Rate, RateError};

use std::cmp::{Ord, Ordering};

use crossbeam::channel::{Receiver, RecvTimeoutError, TryRecvError};
use quanta::{Clock, Instant};
use thiserror::Error;

use chatter_core::Node;

/// A sleep was cut short because the interrupt channel fired.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("sleep interrupted by shutdown")]
pub struct Interrupted;

/// Block until `deadline` passes or `interrupt` fires, whichever is first.
///
/// The interrupt fires when `true` is received or when every sender has been
/// dropped.  A `false` value is ignored.
pub fn sleep_until(
    interrupt: &Receiver<bool>,
    clock: &Clock,
    deadline: Instant,
) -> Result<(), Interrupted> {
    loop {
        let now = clock.now();
        if now >= deadline {
            return Ok(());
        }

        match interrupt.recv_timeout(deadline.saturating_duration_since(now)) {
            Ok(true) | Err(RecvTimeoutError::Disconnected) => return Err(Interrupted),
            Ok(false) | Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Poll `interrupt` without blocking.
///
/// Returns true if `true` was received or every sender has been dropped.
pub fn poll_interrupt(interrupt: &Receiver<bool>) -> bool {
    loop {
        match interrupt.try_recv() {
            Ok(true) | Err(TryRecvError::Disconnected) => return true,
            Ok(false) => {}
            Err(TryRecvError::Empty) => return false,
        }
    }
}

/// The NodeWrapper wraps nodes giving them a priority based on the timestamp
/// (in us since the executor started) of their next update.
pub(crate) struct NodeWrapper {
    /// The timestamp of the node's next update
    pub priority: u128,
    /// The node this NodeWrapper is wrapping around
    pub node: Box<dyn Node>,
}

impl Ord for NodeWrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).reverse()
    }
}

impl PartialOrd for NodeWrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NodeWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl Eq for NodeWrapper {}

/// Binary search insertion into the sorted vector `vec`.
///
/// The vector is sorted so that the node due soonest sits at the end.
#[inline(always)]
pub(crate) fn insert_into(vec: &mut Vec<NodeWrapper>, node: NodeWrapper) {
    // Nodes with equal priority keep their insertion order
    match vec.binary_search(&node) {
        Ok(idx) => vec.insert(idx + 1, node),
        Err(idx) => vec.insert(idx, node),
    }
}
