//!
//! The Simple Executor
//!
//! The simple executor is a singular thread that stores each node in a
//! sorted vector, sleeps until the node at the front is due, executes its
//! update method and then inserts it back into the sorted vector with an
//! updated priority.
//!
//! The sleep between updates blocks on the interrupt channel, so an
//! interrupt that arrives mid-sleep stops the executor before any further
//! update runs.
//!

use std::time::Duration;

use crossbeam::channel::Receiver;

use quanta::{Clock, Instant};

use chatter_core::{Executor, ExecutorState, Node};

use crate::{insert_into, poll_interrupt, sleep_until, NodeWrapper};

/// Simple Executor
///
/// This simple executor stores Nodes in a sorted vector where the
/// priority is higher the closer to the current timestamp the Node's
/// next update is.
///
/// Note: The Simple Executor can be interrupted by sending a true value
/// over the channel whose receiving end is owned by the SimpleExecutor, or
/// by dropping every sender of that channel.
pub struct SimpleExecutor {
    // The sorted backing vector for the executor
    backing: Vec<NodeWrapper>,
    // The quanta high-precision clock backing the SimpleExecutor
    clock: Clock,
    // The current state of the executor
    state: ExecutorState,
    // The Instant the executor was started
    start_instant: Instant,
    // The Interrupt receiver channel
    interrupt: Receiver<bool>,
    // Whether or not the executor has been interrupted
    interrupted: bool,
}

impl SimpleExecutor {
    /// Create a new Simple Executor without any Nodes
    pub fn new(interrupt: Receiver<bool>) -> Self {
        Self::new_with(interrupt, Vec::new())
    }

    /// Creates a new Simple Executor with a number of Nodes
    pub fn new_with(interrupt: Receiver<bool>, nodes: Vec<Box<dyn Node>>) -> Self {
        let backing = nodes
            .into_iter()
            .map(|node| NodeWrapper { priority: 0, node })
            .collect();

        let clock = Clock::new();
        let now = clock.now();

        Self {
            backing,
            clock,
            start_instant: now,
            state: ExecutorState::Stopped,
            interrupt,
            interrupted: false,
        }
    }

    /// The current state of the executor
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Whether the last run ended because of an interrupt
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// The number of nodes held by the executor
    pub fn len(&self) -> usize {
        self.backing.len()
    }

    /// Whether the executor holds no nodes
    pub fn is_empty(&self) -> bool {
        self.backing.is_empty()
    }

    fn elapsed_us(&self) -> u128 {
        self.clock.now().duration_since(self.start_instant).as_micros()
    }

    fn instant_at(&self, us: u128) -> Option<Instant> {
        let us = u64::try_from(us).ok()?;
        self.start_instant.checked_add(Duration::from_micros(us))
    }

    /// Block until an interrupt arrives.
    fn wait_for_interrupt(&mut self) {
        while let Ok(false) = self.interrupt.recv() {}
        self.interrupted = true;
    }

    /// Run nodes until interrupted or until `end` passes
    fn run(&mut self, end: Option<Instant>) {
        self.start();

        self.state = ExecutorState::Running;
        log::debug!("executor running {} node(s)", self.backing.len());
        while !self.check_interrupt() {
            let due = self
                .backing
                .last()
                .and_then(|node_wrapper| self.instant_at(node_wrapper.priority));
            let wake = match (due, end) {
                (Some(due), Some(end)) => due.min(end),
                (Some(due), None) => due,
                (None, Some(end)) => end,
                (None, None) => {
                    self.wait_for_interrupt();
                    break;
                }
            };

            if sleep_until(&self.interrupt, &self.clock, wake).is_err() {
                self.interrupted = true;
                break;
            }

            let now = self.clock.now();
            if end.is_some_and(|end| now >= end) {
                break;
            }
            if due.is_some_and(|due| now >= due) {
                self.update_next();
            }
        }

        // Stop the Executor
        for node_wrapper in self.backing.iter_mut() {
            node_wrapper.priority = 0;
            node_wrapper.node.shutdown();
        }
        self.state = ExecutorState::Stopped;
        log::debug!("executor stopped (interrupted: {})", self.interrupted);
    }

    /// Update the node due soonest and reschedule it.
    fn update_next(&mut self) {
        let Some(mut node_wrapper) = self.backing.pop() else {
            return;
        };

        node_wrapper.node.update();
        node_wrapper.priority += node_wrapper.node.get_update_delay_us();

        // Skip ticks that were missed instead of bursting to catch up
        let elapsed = self.elapsed_us();
        if node_wrapper.priority < elapsed {
            log::warn!(
                "node overran its {}us update delay by {}us",
                node_wrapper.node.get_update_delay_us(),
                elapsed - node_wrapper.priority
            );
            node_wrapper.priority = elapsed;
        }

        insert_into(&mut self.backing, node_wrapper);
    }
}

impl Executor for SimpleExecutor {
    /// For each node in the simple executor we reset their priority to 0
    /// and start the node.  We also set the start_instant to the current time.
    ///
    /// Note: this method is called during the `update_for_ms` and `update_loop`
    /// methods so calling it by hand first is redundant.
    fn start(&mut self) {
        for node_wrapper in self.backing.iter_mut() {
            node_wrapper.priority = 0;
            node_wrapper.node.start();
        }

        self.interrupted = false;
        self.state = ExecutorState::Started;
        self.start_instant = self.clock.now();
    }

    /// Start the executor and run it for a given number of milliseconds before
    /// stopping.  An interrupt will also stop the executor early.
    fn update_for_ms(&mut self, ms: u128) {
        let end = u64::try_from(ms)
            .ok()
            .and_then(|ms| self.clock.now().checked_add(Duration::from_millis(ms)));
        self.run(end);
    }

    /// Start the executor and run until an interrupt is received.
    fn update_loop(&mut self) {
        self.run(None);
    }

    /// Check the interrupt receiver for an interrupt.
    fn check_interrupt(&mut self) -> bool {
        if poll_interrupt(&self.interrupt) {
            self.interrupted = true;
        }
        self.interrupted
    }

    /// Add a node to the Simple Executor.
    ///
    /// Note: If nodes are added in `ExecutorState::Started` or
    /// `ExecutorState::Running` the node is inserted into the backing
    /// vector by priority so it is updated next.
    fn add_node(&mut self, node: Box<dyn Node>) {
        if self.state == ExecutorState::Stopped {
            self.backing.push(NodeWrapper { priority: 0, node });
        } else {
            let priority = self.elapsed_us();
            insert_into(&mut self.backing, NodeWrapper { priority, node });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        sync::{
            atomic::{AtomicU8, AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use crossbeam::channel::unbounded;

    const STOPPED: u8 = 0;
    const STARTED: u8 = 1;
    const UPDATING: u8 = 2;

    #[derive(Clone, Default)]
    struct Probe {
        state: Arc<AtomicU8>,
        updates: Arc<AtomicUsize>,
    }

    impl Probe {
        fn state(&self) -> u8 {
            self.state.load(Ordering::SeqCst)
        }

        fn updates(&self) -> usize {
            self.updates.load(Ordering::SeqCst)
        }
    }

    struct SimpleNode {
        update_delay: u128,
        probe: Probe,
    }

    impl SimpleNode {
        fn new(update_delay: u128) -> (Self, Probe) {
            let probe = Probe::default();
            (
                Self {
                    update_delay,
                    probe: probe.clone(),
                },
                probe,
            )
        }
    }

    impl Node for SimpleNode {
        fn start(&mut self) {
            self.probe.state.store(STARTED, Ordering::SeqCst);
        }

        fn update(&mut self) {
            self.probe.state.store(UPDATING, Ordering::SeqCst);
            self.probe.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn shutdown(&mut self) {
            self.probe.state.store(STOPPED, Ordering::SeqCst);
        }

        fn get_update_delay_us(&self) -> u128 {
            self.update_delay
        }
    }

    fn two_nodes(fast: u128, slow: u128) -> (Vec<Box<dyn Node>>, Probe, Probe) {
        let (fast_node, fast_probe) = SimpleNode::new(fast);
        let (slow_node, slow_probe) = SimpleNode::new(slow);
        (
            vec![Box::new(fast_node), Box::new(slow_node)],
            fast_probe,
            slow_probe,
        )
    }

    #[test]
    /// Start should set the priority of all nodes to 0, start all nodes, set its
    /// interrupted value to false, enter the ExecutorState::Started state and set its
    /// start instant
    fn test_simple_executor_start() {
        let (_tx, rx) = unbounded();
        let (nodes, fast, slow) = two_nodes(100_000, 250_000);

        let mut executor = SimpleExecutor::new_with(rx, nodes);
        let original_start_instant = executor.start_instant;
        thread::sleep(Duration::from_millis(1));

        executor.start();

        for node_wrapper in executor.backing.iter() {
            assert_eq!(node_wrapper.priority, 0);
        }
        assert_eq!(fast.state(), STARTED);
        assert_eq!(slow.state(), STARTED);
        assert!(!executor.interrupted);
        assert_eq!(executor.state, ExecutorState::Started);
        assert!(executor.start_instant > original_start_instant);
    }

    #[test]
    fn test_update_for_ms() {
        let (_tx, rx) = unbounded();
        let (nodes, fast, slow) = two_nodes(10_000, 25_000);
        let mut executor = SimpleExecutor::new_with(rx, nodes);

        let start = executor.clock.now();
        executor.update_for_ms(100);
        let end = executor.clock.now();

        for node_wrapper in executor.backing.iter() {
            assert_eq!(node_wrapper.priority, 0);
        }
        assert_eq!(fast.state(), STOPPED);
        assert_eq!(slow.state(), STOPPED);
        assert!((9..=11).contains(&fast.updates()), "fast: {}", fast.updates());
        assert!((3..=5).contains(&slow.updates()), "slow: {}", slow.updates());

        assert!(Duration::from_millis(95) < end - start);
        assert!(end - start < Duration::from_millis(150));
        assert!(!executor.interrupted());
    }

    #[test]
    fn test_ten_hz_for_one_second() {
        let (_tx, rx) = unbounded();
        let (node, probe) = SimpleNode::new(100_000);
        let mut executor = SimpleExecutor::new_with(rx, vec![Box::new(node)]);

        executor.update_for_ms(1_000);

        assert!((9..=11).contains(&probe.updates()), "updates: {}", probe.updates());
    }

    #[test]
    fn test_check_interrupt() {
        let (tx, rx) = unbounded();
        let (nodes, _, _) = two_nodes(10_000, 25_000);
        let mut executor = SimpleExecutor::new_with(rx, nodes);

        assert!(!executor.check_interrupt());
        tx.send(true).unwrap();
        assert!(executor.check_interrupt());
    }

    #[test]
    fn test_check_interrupt_sender_dropped() {
        let (tx, rx) = unbounded();
        let mut executor = SimpleExecutor::new(rx);

        drop(tx);
        assert!(executor.check_interrupt());
    }

    #[test]
    fn test_add_node_stopped() {
        let (_tx, rx) = unbounded();
        let (nodes, _, _) = two_nodes(10_000, 25_000);
        let mut executor = SimpleExecutor::new_with(rx, nodes);

        let (node, _) = SimpleNode::new(1_000);
        executor.add_node(Box::new(node));

        assert_eq!(executor.len(), 3);
    }

    #[test]
    fn test_add_node_started() {
        let (_tx, rx) = unbounded();
        let (nodes, _, _) = two_nodes(10_000, 25_000);
        let mut executor = SimpleExecutor::new_with(rx, nodes);
        executor.start();
        thread::sleep(Duration::from_millis(5));

        let (node, _) = SimpleNode::new(1_000);
        executor.add_node(Box::new(node));

        assert_eq!(executor.len(), 3);
        assert!(executor.backing[0].priority >= 5_000);
    }

    #[test]
    fn test_update_loop() {
        let (tx, rx) = unbounded();
        let (nodes, fast, slow) = two_nodes(10_000, 25_000);
        let mut executor = SimpleExecutor::new_with(rx, nodes);

        let handle = thread::spawn(move || {
            executor.update_loop();
            executor
        });

        thread::sleep(Duration::from_millis(100));
        tx.send(true).unwrap();

        let executor = handle.join().unwrap();
        for node_wrapper in executor.backing.iter() {
            assert_eq!(node_wrapper.priority, 0);
        }
        assert_eq!(fast.state(), STOPPED);
        assert_eq!(slow.state(), STOPPED);
        assert!((9..=12).contains(&fast.updates()), "fast: {}", fast.updates());
        assert!((3..=6).contains(&slow.updates()), "slow: {}", slow.updates());

        assert!(executor.interrupted());
        assert_eq!(executor.state(), ExecutorState::Stopped);
    }

    #[test]
    /// An interrupt while the executor sleeps stops it within one tick and
    /// no update follows the interrupt.
    fn test_interrupt_during_sleep() {
        let (tx, rx) = unbounded();
        let (node, probe) = SimpleNode::new(1_000_000);
        let mut executor = SimpleExecutor::new_with(rx, vec![Box::new(node)]);

        let handle = thread::spawn(move || {
            let clock = Clock::new();
            let start = clock.now();
            executor.update_loop();
            (executor, clock.now() - start)
        });

        thread::sleep(Duration::from_millis(50));
        drop(tx);

        let (executor, ran_for) = handle.join().unwrap();
        assert_eq!(probe.updates(), 1);
        assert!(ran_for < Duration::from_millis(500));
        assert!(executor.interrupted());
    }

    #[test]
    fn test_update_loop_without_nodes() {
        let (tx, rx) = unbounded();
        let mut executor = SimpleExecutor::new(rx);

        let handle = thread::spawn(move || {
            executor.update_loop();
            executor
        });

        thread::sleep(Duration::from_millis(20));
        tx.send(true).unwrap();

        let executor = handle.join().unwrap();
        assert!(executor.interrupted());
        assert!(executor.is_empty());
    }
}
