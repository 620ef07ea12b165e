//!
//! The talker publishes `hello world <time>` on a topic at a fixed rate and
//! the listener prints every message it hears on that topic.
//!
//! Both run inside one node: the talker is a Node driven by a
//! SimpleExecutor on the calling thread, while the listener is a callback
//! invoked by the topic's dispatch pool.
//!

use std::{
    io::{self, Write},
    time::Duration,
};

use chatter_core::{Executor, Node, Publisher};
use chatter_executors::{RateError, SimpleExecutor};

use crate::{ChatterError, NodeClock, NodeHandle};

/// The message published at node time `secs`.
///
/// Whole seconds keep their fractional part, as in `hello world 12.0`.
pub fn format_message(secs: f64) -> String {
    format!("hello world {:?}", secs)
}

/// The line printed when `caller_id` hears `payload`.
///
/// The literal `%s` is part of the line.
pub fn format_heard(caller_id: &str, payload: &str) -> String {
    format!("{}I heard %s {}", caller_id, payload)
}

/// Write the heard line for `payload` to `out` and flush it
pub fn write_heard<W: Write>(out: &mut W, caller_id: &str, payload: &str) -> io::Result<()> {
    writeln!(out, "{}", format_heard(caller_id, payload))?;
    out.flush()
}

/// A listener callback for a node called `caller_id` writing to `out`
pub fn listener_to<W>(caller_id: String, mut out: W) -> impl FnMut(String) + Send + 'static
where
    W: Write + Send + 'static,
{
    move |payload| {
        if let Err(err) = write_heard(&mut out, &caller_id, &payload) {
            log::warn!("failed to write heard message: {}", err);
        }
    }
}

/// The listener callback for a node called `caller_id`, printing to stdout
pub fn listener(caller_id: String) -> impl FnMut(String) + Send + 'static {
    listener_to(caller_id, io::stdout())
}

/// Talker Node
///
/// Every update formats the current node time into a message, logs it and
/// publishes it.
pub struct Talker<P> {
    publisher: P,
    clock: NodeClock,
    update_delay_us: u128,
    published: u64,
}

impl<P> Talker<P>
where
    P: Publisher<Data = String> + Send,
    ChatterError: From<P::Error>,
{
    /// Create a talker publishing `hz` times per second
    pub fn new(publisher: P, clock: NodeClock, hz: f64) -> Result<Self, ChatterError> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(RateError::InvalidFrequency(hz).into());
        }

        Ok(Self {
            publisher,
            clock,
            update_delay_us: Duration::from_secs_f64(1.0 / hz).as_micros(),
            published: 0,
        })
    }

    /// Publish one message
    pub fn talk(&mut self) -> Result<(), ChatterError> {
        let message = format_message(self.clock.now_secs());
        log::info!("{}", message);
        self.publisher.publish(message)?;
        self.published += 1;
        Ok(())
    }

    /// The number of messages published so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl<P> Node for Talker<P>
where
    P: Publisher<Data = String> + Send,
    ChatterError: From<P::Error>,
{
    fn get_update_delay_us(&self) -> u128 {
        self.update_delay_us
    }

    fn update(&mut self) {
        match self.talk() {
            Ok(()) => {}
            Err(ChatterError::InterruptedShutdown) => {
                log::debug!("skipped publish, node is shutting down")
            }
            Err(err) => log::error!("failed to publish: {}", err),
        }
    }

    fn shutdown(&mut self) {
        log::debug!("talker published {} message(s)", self.published);
    }
}

/// Options for `talker_listener`
#[derive(Clone, Debug, PartialEq)]
pub struct TalkerListenerOptions {
    /// The topic to publish and listen on
    pub topic: String,
    /// Messages published per second
    pub rate: f64,
    /// How many received messages may wait for the listener
    pub queue_size: usize,
    /// Stop after this long instead of waiting for shutdown
    pub duration: Option<Duration>,
}

impl Default for TalkerListenerOptions {
    fn default() -> Self {
        Self {
            topic: String::from("chatter"),
            rate: 10.0,
            queue_size: 10,
            duration: None,
        }
    }
}

/// Publish on and listen to one topic from `node`.
///
/// Runs until the node shuts down, or for `options.duration` when set.
/// A shutdown ends the run with `ChatterError::InterruptedShutdown`.
pub fn talker_listener(
    node: &NodeHandle,
    options: &TalkerListenerOptions,
) -> Result<(), ChatterError> {
    let publisher = node.publisher::<String>(&options.topic)?;
    let _subscriber = node.subscribe(
        &options.topic,
        options.queue_size,
        listener(node.caller_id().to_string()),
    )?;
    let talker = Talker::new(publisher, node.clock(), options.rate)?;

    let mut executor = SimpleExecutor::new_with(node.interrupt(), vec![Box::new(talker)]);
    match options.duration {
        Some(duration) => executor.update_for_ms(duration.as_millis()),
        None => executor.update_loop(),
    }

    if executor.interrupted() {
        return Err(ChatterError::InterruptedShutdown);
    }
    Ok(())
}
