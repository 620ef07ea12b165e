//!
//! Local Publishers and Subscribers
//!
//! Local Publishers and Subscribers share data between nodes living in the
//! same process over crossbeam channels.
//!
//! Two kinds of subscriber exist.  Polling subscribers (`LocalSubscriber`,
//! `LocalTTLSubscriber`) hold the most recent piece of data and are read by
//! their node on its own schedule.  Callback subscribers
//! (`LocalCallbackSubscriber`) register a handler that the publisher's
//! dispatch pool invokes for every message, asynchronously to whoever
//! publishes.
//!

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use thiserror::Error;
use threadpool::ThreadPool;

use chatter_core::{Publisher, Subscriber};

/// An error from creating, publishing to or subscribing to a local topic
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LocalError {
    /// The publisher has been closed and accepts no more data
    #[error("publisher has been closed")]
    Closed,
    /// The topic name is empty or contains whitespace
    #[error("invalid topic name {0:?}")]
    InvalidTopicName(String),
    /// The topic already carries a different message type
    #[error("topic {topic} carries {expected}, not {found}")]
    TopicTypeMismatch {
        /// The resolved topic name
        topic: String,
        /// The type the topic was first registered with
        expected: &'static str,
        /// The type of the rejected registration
        found: &'static str,
    },
    /// A callback queue must hold at least one message
    #[error("queue size must be at least 1")]
    InvalidQueueSize,
}

/// Lock a mutex, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The message carried by a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Local Subscriber that utilizes a crossbeam channel to receive the most
/// recent data from a local publisher
pub struct LocalSubscriber<Data: Clone> {
    /// The receiver end of a crossbeam channel
    rx: Receiver<Data>,
    /// The current data stored in the local subscriber
    data: Option<Data>,
}

impl<Data: Clone> Subscriber for LocalSubscriber<Data> {
    type Target = Option<Data>;

    fn get(&mut self) -> &Self::Target {
        if let Some(data) = self.rx.try_iter().last() {
            self.data = Some(data);
        }

        &self.data
    }
}

/// Local subscriber where data has a specific time-to-live and will decay
/// after the lifetime has passed
pub struct LocalTTLSubscriber<Data: Clone> {
    /// The receiver end of a crossbeam channel
    rx: Receiver<Data>,
    /// The current data stored in the local subscriber
    data: Option<(Data, Instant)>,
    /// The time-to-live of a piece of data
    ttl: Duration,
}

impl<Data: Clone> Subscriber for LocalTTLSubscriber<Data> {
    type Target = Option<(Data, Instant)>;

    fn get(&mut self) -> &Self::Target {
        if let Some(data) = self.rx.try_iter().last() {
            self.data = Some((data, Instant::now()));
        }

        if self
            .data
            .as_ref()
            .is_some_and(|(_, received)| received.elapsed() > self.ttl)
        {
            self.data = None;
        }

        &self.data
    }
}

/// The publisher's half of a callback subscription
struct CallbackSlot<Data> {
    id: u64,
    tx: Sender<Data>,
    // Kept so a full queue can drop its oldest message
    rx: Receiver<Data>,
    active: Arc<AtomicBool>,
}

/// State shared by every clone of a LocalPublisher
struct Shared<Data> {
    txs: Mutex<Vec<Sender<Data>>>,
    callbacks: Mutex<Vec<CallbackSlot<Data>>>,
    data: Mutex<Option<(Data, Instant)>>,
    pool: Mutex<ThreadPool>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Subscriber whose handler is invoked by the publisher's dispatch pool for
/// every published message.
///
/// Delivery stops when the subscriber is dropped, when `unsubscribe` is
/// called, or when the publisher is closed.
pub struct LocalCallbackSubscriber<Data> {
    id: u64,
    active: Arc<AtomicBool>,
    shared: Weak<Shared<Data>>,
}

impl<Data> LocalCallbackSubscriber<Data> {
    /// Whether messages are still being delivered to the handler
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop delivery to the handler
    pub fn unsubscribe(self) {}
}

impl<Data> Drop for LocalCallbackSubscriber<Data> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.callbacks).retain(|slot| slot.id != self.id);
        }
    }
}

/// Local Publisher that sends each piece of data to every polling
/// subscriber and every callback subscriber of the topic
pub struct LocalPublisher<Data: Clone + Send + 'static> {
    shared: Arc<Shared<Data>>,
}

impl<Data: Clone + Send + 'static> LocalPublisher<Data> {
    /// Create a new local publisher
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                txs: Mutex::new(Vec::new()),
                callbacks: Mutex::new(Vec::new()),
                data: Mutex::new(None),
                pool: Mutex::new(ThreadPool::with_name("chatter-dispatch".into(), 1)),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Create a local subscriber.
    ///
    /// The subscriber starts out holding the most recently published data.
    pub fn subscribe(&self) -> LocalSubscriber<Data> {
        let (tx, rx) = channel::unbounded();
        lock(&self.shared.txs).push(tx);

        let data = lock(&self.shared.data).as_ref().map(|data| data.0.clone());

        LocalSubscriber { rx, data }
    }

    /// Create a local subscriber with a specific time-to-live of pieces of data
    pub fn subscribe_ttl(&self, ttl: Duration) -> LocalTTLSubscriber<Data> {
        let (tx, rx) = channel::unbounded();
        lock(&self.shared.txs).push(tx);

        let data = lock(&self.shared.data)
            .as_ref()
            .filter(|(_, published)| published.elapsed() <= ttl)
            .cloned();

        LocalTTLSubscriber { rx, data, ttl }
    }

    /// Register `handler` to be called with every piece of data published
    /// from now on.
    ///
    /// At most `queue_size` messages wait for the handler.  When the queue
    /// is full the oldest waiting message is dropped.
    pub fn subscribe_callback<F>(
        &self,
        queue_size: usize,
        mut handler: F,
    ) -> Result<LocalCallbackSubscriber<Data>, LocalError>
    where
        F: FnMut(Data) + Send + 'static,
    {
        if queue_size == 0 {
            return Err(LocalError::InvalidQueueSize);
        }
        if self.is_closed() {
            return Err(LocalError::Closed);
        }

        let (tx, rx) = channel::bounded(queue_size);
        let active = Arc::new(AtomicBool::new(true));
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);

        {
            // Each subscription holds one worker for as long as it lives
            let mut pool = lock(&self.shared.pool);
            let needed = pool.active_count() + pool.queued_count() + 1;
            if needed > pool.max_count() {
                pool.set_num_threads(needed);
            }

            let job_rx: Receiver<Data> = rx.clone();
            let job_active = active.clone();
            pool.execute(move || {
                for data in job_rx.iter() {
                    if !job_active.load(Ordering::Acquire) {
                        break;
                    }
                    // A panicking handler loses that message, not the subscription
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(data))) {
                        log::error!(
                            "callback subscriber {} panicked: {}",
                            id,
                            panic_message(payload.as_ref())
                        );
                    }
                }
            });
        }

        lock(&self.shared.callbacks).push(CallbackSlot {
            id,
            tx,
            rx,
            active: active.clone(),
        });
        log::debug!("registered callback subscriber {}", id);

        Ok(LocalCallbackSubscriber {
            id,
            active,
            shared: Arc::downgrade(&self.shared),
        })
    }

    /// The number of live subscribers of either kind
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.txs).len() + lock(&self.shared.callbacks).len()
    }

    /// Close the publisher.
    ///
    /// Further publishes fail with `LocalError::Closed` and callback
    /// subscribers stop receiving data.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        for slot in lock(&self.shared.callbacks).drain(..) {
            slot.active.store(false, Ordering::Release);
        }
        lock(&self.shared.txs).clear();
    }

    /// Whether the publisher has been closed
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl<Data: Clone + Send + 'static> Default for LocalPublisher<Data> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Data: Clone + Send + 'static> Clone for LocalPublisher<Data> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<Data: Clone + Send + 'static> Publisher for LocalPublisher<Data> {
    type Data = Data;
    type Error = LocalError;

    fn publish(&mut self, data: Self::Data) -> Result<(), Self::Error> {
        if self.is_closed() {
            return Err(LocalError::Closed);
        }

        // Polling subscribers that were dropped are pruned here
        lock(&self.shared.txs).retain(|tx| tx.send(data.clone()).is_ok());

        for slot in lock(&self.shared.callbacks).iter() {
            if let Err(TrySendError::Full(data)) = slot.tx.try_send(data.clone()) {
                let _ = slot.rx.try_recv();
                log::warn!("callback queue {} is full, dropped its oldest message", slot.id);
                let _ = slot.tx.try_send(data);
            }
        }

        *lock(&self.shared.data) = Some((data, Instant::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use rand::{distributions::Alphanumeric, Rng};

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn test_subscriber_reads_latest() {
        let mut publisher = LocalPublisher::new();
        let mut subscriber = publisher.subscribe();
        assert_eq!(subscriber.get(), &None);

        publisher.publish(1u8).unwrap();
        publisher.publish(2u8).unwrap();
        assert_eq!(subscriber.get(), &Some(2));
    }

    #[test]
    fn test_late_subscriber_starts_with_latest() {
        let mut publisher = LocalPublisher::new();
        publisher.publish(String::from("first")).unwrap();

        let mut subscriber = publisher.subscribe();
        assert_eq!(subscriber.get().as_deref(), Some("first"));
    }

    #[test]
    fn test_ttl_subscriber_expires() {
        let mut publisher = LocalPublisher::new();
        let mut subscriber = publisher.subscribe_ttl(Duration::from_millis(20));

        publisher.publish(7u32).unwrap();
        assert_eq!(subscriber.get().as_ref().map(|d| d.0), Some(7));

        thread::sleep(Duration::from_millis(40));
        assert!(subscriber.get().is_none());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let mut publisher = LocalPublisher::new();
        let subscriber = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);

        drop(subscriber);
        publisher.publish(0u8).unwrap();
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_receives_in_order() {
        let mut publisher = LocalPublisher::new();
        let (tx, rx) = channel::unbounded();
        let _subscriber = publisher
            .subscribe_callback(100, move |data: String| tx.send(data).unwrap())
            .unwrap();

        let sent: Vec<String> = (0..20)
            .map(|_| {
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(12)
                    .map(char::from)
                    .collect()
            })
            .collect();
        for data in sent.iter() {
            publisher.publish(data.clone()).unwrap();
        }

        let received: Vec<String> = (0..sent.len())
            .map(|_| rx.recv_timeout(WAIT).unwrap())
            .collect();
        assert_eq!(received, sent);
    }

    #[test]
    fn test_panicking_callback_keeps_receiving() {
        let mut publisher = LocalPublisher::new();
        let (tx, rx) = channel::unbounded();
        let subscriber = publisher
            .subscribe_callback(10, move |data: u8| {
                if data == 0 {
                    panic!("cannot handle zero");
                }
                tx.send(data).unwrap();
            })
            .unwrap();

        for data in 0..=4 {
            publisher.publish(data).unwrap();
        }

        let received: Vec<u8> = (0..4).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        assert_eq!(received, vec![1, 2, 3, 4]);
        assert!(subscriber.is_active());

        publisher.publish(5).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 5);
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted 1");
    }

    #[test]
    fn test_callback_runs_off_the_publishing_thread() {
        let mut publisher = LocalPublisher::new();
        let (tx, rx) = channel::unbounded();
        let _subscriber = publisher
            .subscribe_callback(1, move |_: u8| tx.send(thread::current().id()).unwrap())
            .unwrap();

        publisher.publish(0).unwrap();
        assert_ne!(rx.recv_timeout(WAIT).unwrap(), thread::current().id());
    }

    #[test]
    fn test_multiple_callback_subscribers() {
        let mut publisher = LocalPublisher::new();
        let (tx, rx) = channel::unbounded();
        let subscribers: Vec<_> = (0..3)
            .map(|idx| {
                let tx = tx.clone();
                publisher
                    .subscribe_callback(10, move |data: u8| tx.send((idx, data)).unwrap())
                    .unwrap()
            })
            .collect();

        publisher.publish(9).unwrap();

        let mut received: Vec<(i32, u8)> =
            (0..3).map(|_| rx.recv_timeout(WAIT).unwrap()).collect();
        received.sort();
        assert_eq!(received, vec![(0, 9), (1, 9), (2, 9)]);
        assert!(subscribers.iter().all(|s| s.is_active()));
    }

    #[test]
    fn test_full_callback_queue_drops_oldest() {
        let mut publisher = LocalPublisher::new();
        let (out_tx, out_rx) = channel::unbounded();
        let (gate_tx, gate_rx) = channel::unbounded::<()>();
        let _subscriber = publisher
            .subscribe_callback(2, move |data: u8| {
                out_tx.send(data).unwrap();
                let _ = gate_rx.recv();
            })
            .unwrap();

        // The handler holds 0 and blocks, so 1..=4 pile up in a queue of 2
        publisher.publish(0).unwrap();
        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), 0);
        for data in 1..=4 {
            publisher.publish(data).unwrap();
        }
        drop(gate_tx);

        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), 3);
        assert_eq!(out_rx.recv_timeout(WAIT).unwrap(), 4);
        assert!(out_rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_dropped_callback_subscriber_stops_delivery() {
        let mut publisher = LocalPublisher::new();
        let (tx, rx) = channel::unbounded();
        let subscriber = publisher
            .subscribe_callback(10, move |data: u8| tx.send(data).unwrap())
            .unwrap();

        publisher.publish(1).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), 1);

        subscriber.unsubscribe();
        assert_eq!(publisher.subscriber_count(), 0);
        publisher.publish(2).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_close() {
        let mut publisher = LocalPublisher::new();
        let subscriber = publisher.subscribe_callback(1, |_: u8| {}).unwrap();

        publisher.close();

        assert!(publisher.is_closed());
        assert!(!subscriber.is_active());
        assert_eq!(publisher.publish(1), Err(LocalError::Closed));
        assert!(matches!(
            publisher.subscribe_callback(1, |_: u8| {}),
            Err(LocalError::Closed)
        ));
    }

    #[test]
    fn test_zero_queue_size_rejected() {
        let publisher = LocalPublisher::<u8>::new();
        assert!(matches!(
            publisher.subscribe_callback(0, |_| {}),
            Err(LocalError::InvalidQueueSize)
        ));
    }
}
