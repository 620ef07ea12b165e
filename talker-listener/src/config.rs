//!
//! Command line configuration.
//!
//! Every flag has a default so that running the binary bare publishes on
//! `chatter` at 10 Hz from an anonymous `talker_listener` node.
//!

use std::time::Duration;

use clap::Parser;

use chatter::prelude::{ChatterError, NodeOptions, TalkerListenerOptions};

/// Talker/listener configuration
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "talker-listener")]
#[command(about = "Publish timestamped messages on a topic and print everything heard on it", long_about = None)]
pub struct Config {
    /// Base node name
    #[arg(long, default_value = "talker_listener")]
    pub name: String,

    /// Use the node name as given instead of making it unique
    #[arg(long)]
    pub no_anonymous: bool,

    /// Topic to publish and listen on
    #[arg(short, long, default_value = "chatter")]
    pub topic: String,

    /// Messages published per second
    #[arg(short, long, default_value_t = 10.0)]
    pub rate: f64,

    /// How many received messages may wait for the listener
    #[arg(short, long, default_value_t = 10)]
    pub queue_size: usize,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long)]
    pub duration_secs: Option<f64>,
}

impl Config {
    /// The options of the node to start
    pub fn node_options(&self) -> NodeOptions {
        NodeOptions::new(self.name.clone()).anonymous(!self.no_anonymous)
    }

    /// The options of the talker/listener loop
    pub fn talker_listener_options(&self) -> Result<TalkerListenerOptions, ChatterError> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ChatterError::InvalidConfig(format!(
                "--rate must be above zero, got {}",
                self.rate
            )));
        }
        if self.queue_size == 0 {
            return Err(ChatterError::InvalidConfig(String::from(
                "--queue-size must be at least 1",
            )));
        }

        let duration = self
            .duration_secs
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    ChatterError::InvalidConfig(format!(
                        "--duration-secs must be a non-negative number, got {}",
                        secs
                    ))
                })
            })
            .transpose()?;

        Ok(TalkerListenerOptions {
            topic: self.topic.clone(),
            rate: self.rate,
            queue_size: self.queue_size,
            duration,
        })
    }
}
