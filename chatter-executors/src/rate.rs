//!
//! A fixed-rate sleeper.
//!
//! `Rate` keeps a loop running at a target frequency by sleeping for
//! whatever is left of the current period.  The sleep is interruptible
//! so a shutdown during the sleep ends the loop within one period.
//!

use std::time::Duration;

use crossbeam::channel::Receiver;
use quanta::{Clock, Instant};
use thiserror::Error;

use crate::{sleep_until, Interrupted};

/// An error from constructing a Rate
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum RateError {
    /// The requested frequency was zero, negative or not finite
    #[error("invalid rate frequency {0} Hz, expected a finite value above zero")]
    InvalidFrequency(f64),
}

/// Rate
///
/// Sleeps so that successive calls to `sleep` return once per period.
///
/// If the caller overruns by more than a whole period, the schedule is reset
/// to the current time instead of returning immediately for every missed tick.
pub struct Rate {
    // The quanta high-precision clock backing the Rate
    clock: Clock,
    // The length of one tick
    period: Duration,
    // When the current tick ends
    next: Instant,
    // The interrupt receiver channel
    interrupt: Receiver<bool>,
    // How many times the schedule has been reset after an overrun
    missed: u64,
}

impl Rate {
    /// Create a new Rate ticking `hz` times per second
    pub fn new(hz: f64, interrupt: Receiver<bool>) -> Result<Self, RateError> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(RateError::InvalidFrequency(hz));
        }

        Ok(Self::from_period(Duration::from_secs_f64(1.0 / hz), interrupt))
    }

    /// Create a new Rate with an explicit period
    pub fn from_period(period: Duration, interrupt: Receiver<bool>) -> Self {
        let clock = Clock::new();
        let next = clock.now() + period;

        Self {
            clock,
            period,
            next,
            interrupt,
            missed: 0,
        }
    }

    /// The length of one tick
    pub fn period(&self) -> Duration {
        self.period
    }

    /// How many times a caller overran a whole tick.
    ///
    /// A zero period never counts as an overrun.
    pub fn missed_ticks(&self) -> u64 {
        self.missed
    }

    /// Sleep for the remainder of the current tick.
    ///
    /// Returns `Err(Interrupted)` as soon as the interrupt fires.
    pub fn sleep(&mut self) -> Result<(), Interrupted> {
        sleep_until(&self.interrupt, &self.clock, self.next)?;

        let now = self.clock.now();
        self.next = self.next + self.period;
        if now > self.next {
            if self.period > Duration::ZERO {
                self.missed += 1;
                log::warn!(
                    "missed tick by {:?}, resetting the {:?} schedule",
                    now - self.next,
                    self.period
                );
            }
            self.next = now + self.period;
        }
        Ok(())
    }
}
