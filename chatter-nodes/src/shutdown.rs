//!
//! The process-wide shutdown signal of a node.
//!
//! The signal is a crossbeam channel whose only sender is dropped when the
//! signal is triggered.  Every receiver handed out by `receiver` then
//! reports a disconnect, which executors and rates treat as an interrupt,
//! so one trigger wakes every sleeper at once.
//!

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use crossbeam::channel::{self, Receiver, Sender};

struct Inner {
    triggered: AtomicBool,
    sender: Mutex<Option<Sender<bool>>>,
    receiver: Receiver<bool>,
}

/// A cloneable, one-shot shutdown signal
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(1);

        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    /// Trigger the signal.
    ///
    /// Returns true for the call that actually triggered it.
    pub fn trigger(&self) -> bool {
        if self.inner.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }

        self.inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        true
    }

    /// Whether the signal has been triggered
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// A receiver that disconnects once the signal is triggered
    pub fn receiver(&self) -> Receiver<bool> {
        self.inner.receiver.clone()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
