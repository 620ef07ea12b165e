//!
//! A single node that publishes "hello world <time>" on a topic ten times a
//! second and prints every message it hears on that same topic.
//!
//! Runs until Ctrl-C, or for `--duration-secs` seconds.
//!

#![deny(missing_docs)]

use clap::Parser;

use chatter::prelude::*;

pub mod config;
use config::Config;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let node = NodeHandle::init(config.node_options())?;
    node.install_ctrlc_handler()?;
    log::debug!("node {} started with {:?}", node.caller_id(), config);

    match talker_listener(&node, &config.talker_listener_options()?) {
        Ok(()) | Err(ChatterError::InterruptedShutdown) => {}
        Err(err) => return Err(err.into()),
    }

    node.shutdown();
    Ok(())
}
