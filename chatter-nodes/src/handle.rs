//!
//! The Node Handle
//!
//! A node handle is acquired once at process start and owns everything the
//! node registers: its name, clock, topics and shutdown signal.  Shutting
//! the handle down (or dropping it) closes every topic and wakes every
//! executor and rate waiting on the node's interrupt.
//!

use std::{process, time::Duration};

use crossbeam::channel::Receiver;

use chatter_executors::Rate;
use chatter_publishers_and_subscribers::{
    LocalCallbackSubscriber, LocalPublisher, LocalSubscriber, TopicRegistry,
};

use crate::{ChatterError, NodeClock, ShutdownSignal};

/// Options for initializing a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeOptions {
    /// The base name of the node
    pub name: String,
    /// Suffix the name with the process id and start time so several
    /// copies of the node can run at once
    pub anonymous: bool,
}

impl NodeOptions {
    /// Options for a node called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            anonymous: true,
        }
    }

    /// Set whether the node name is made unique
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self::new("talker_listener")
    }
}

/// The scoped registration of a node
pub struct NodeHandle {
    name: String,
    caller_id: String,
    clock: NodeClock,
    shutdown: ShutdownSignal,
    registry: TopicRegistry,
}

impl NodeHandle {
    /// Initialize a node
    pub fn init(options: NodeOptions) -> Result<Self, ChatterError> {
        let base = options.name.trim_start_matches('/');
        if base.is_empty() || base.contains(|c: char| c == '/' || c.is_whitespace()) {
            return Err(ChatterError::InvalidConfig(format!(
                "invalid node name {:?}",
                options.name
            )));
        }

        let clock = NodeClock::new();
        let name = if options.anonymous {
            format!(
                "{}_{}_{}",
                base,
                process::id(),
                (clock.now_secs() * 1_000.0) as u64
            )
        } else {
            base.to_string()
        };
        let caller_id = format!("/{}", name);
        log::debug!("initialized node {}", caller_id);

        Ok(Self {
            name,
            caller_id,
            clock,
            shutdown: ShutdownSignal::new(),
            registry: TopicRegistry::new(),
        })
    }

    /// The node's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The node's fully-qualified name
    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// The current node time in seconds
    pub fn get_time(&self) -> f64 {
        self.clock.now_secs()
    }

    /// A clone of the node's clock
    pub fn clock(&self) -> NodeClock {
        self.clock.clone()
    }

    /// Whether the node has been shut down
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_triggered()
    }

    /// Shut the node down.
    ///
    /// Every topic is closed and every executor or rate waiting on the
    /// node's interrupt is woken.  Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.shutdown.trigger() {
            log::info!("shutting down node {}", self.caller_id);
        }
        self.registry.close_all();
    }

    /// The node's shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// An interrupt receiver that fires when the node shuts down
    pub fn interrupt(&self) -> Receiver<bool> {
        self.shutdown.receiver()
    }

    /// Shut the node down when the process receives Ctrl-C.
    ///
    /// Only one handler may be installed per process.
    pub fn install_ctrlc_handler(&self) -> Result<(), ChatterError> {
        let shutdown = self.shutdown.clone();
        ctrlc::set_handler(move || {
            if shutdown.trigger() {
                log::info!("received Ctrl-C, shutting down");
            }
        })?;
        Ok(())
    }

    /// A rate that ticks `hz` times per second until the node shuts down
    pub fn rate(&self, hz: f64) -> Result<Rate, ChatterError> {
        Ok(Rate::new(hz, self.interrupt())?)
    }

    /// Create a publisher on `topic`
    pub fn publisher<Data: Clone + Send + 'static>(
        &self,
        topic: &str,
    ) -> Result<LocalPublisher<Data>, ChatterError> {
        self.check_running()?;
        Ok(self.registry.advertise(topic)?)
    }

    /// Create a subscriber on `topic` that calls `handler` for each message
    pub fn subscribe<Data, F>(
        &self,
        topic: &str,
        queue_size: usize,
        handler: F,
    ) -> Result<LocalCallbackSubscriber<Data>, ChatterError>
    where
        Data: Clone + Send + 'static,
        F: FnMut(Data) + Send + 'static,
    {
        self.check_running()?;
        Ok(self.registry.subscribe_callback(topic, queue_size, handler)?)
    }

    /// Create a polling subscriber on `topic`
    pub fn subscribe_latest<Data: Clone + Send + 'static>(
        &self,
        topic: &str,
    ) -> Result<LocalSubscriber<Data>, ChatterError> {
        self.check_running()?;
        Ok(self.registry.subscribe(topic)?)
    }

    /// Every topic registered on this node with the type of data it carries
    pub fn published_topics(&self) -> Vec<(String, &'static str)> {
        self.registry.topics()
    }

    /// Sleep for `duration` or until the node shuts down
    pub fn sleep(&self, duration: Duration) -> Result<(), ChatterError> {
        Rate::from_period(duration, self.interrupt()).sleep()?;
        Ok(())
    }

    fn check_running(&self) -> Result<(), ChatterError> {
        if self.is_shutdown() {
            return Err(ChatterError::InterruptedShutdown);
        }
        Ok(())
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
