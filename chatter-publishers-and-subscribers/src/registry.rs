//!
//! Topic Registry
//!
//! The registry maps topic names onto local publishers so that publishers
//! and subscribers can be created independently from a topic name, in
//! either order.  The first registration of a topic fixes the type of data
//! it carries and later registrations must agree with it.
//!

use std::{
    any::{type_name, Any},
    collections::BTreeMap,
    sync::Mutex,
    time::Duration,
};

use crate::local::{
    lock, LocalCallbackSubscriber, LocalError, LocalPublisher, LocalSubscriber, LocalTTLSubscriber,
};

/// A type-erased registered topic
trait Topic: Send {
    /// The name of the type of data carried by the topic
    fn type_name(&self) -> &'static str;

    /// The topic's publisher for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Close the topic's publisher
    fn close(&self);
}

impl<Data: Clone + Send + 'static> Topic for LocalPublisher<Data> {
    fn type_name(&self) -> &'static str {
        type_name::<Data>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn close(&self) {
        LocalPublisher::close(self);
    }
}

/// Resolve a topic name to its global form.
///
/// `chatter` and `/chatter` both resolve to `/chatter`.
pub fn resolve_name(topic: &str) -> Result<String, LocalError> {
    let trimmed = topic.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(LocalError::InvalidTopicName(topic.to_string()));
    }

    Ok(format!("/{}", trimmed))
}

/// The collection of topics known to a node
#[derive(Default)]
pub struct TopicRegistry {
    topics: Mutex<BTreeMap<String, Box<dyn Topic>>>,
}

impl TopicRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the publisher for `topic`
    fn publisher<Data: Clone + Send + 'static>(
        &self,
        topic: &str,
    ) -> Result<LocalPublisher<Data>, LocalError> {
        let name = resolve_name(topic)?;
        let mut topics = lock(&self.topics);

        let registered = topics.entry(name.clone()).or_insert_with(|| {
            log::debug!("registered topic {} [{}]", name, type_name::<Data>());
            Box::new(LocalPublisher::<Data>::new()) as Box<dyn Topic>
        });

        registered
            .as_any()
            .downcast_ref::<LocalPublisher<Data>>()
            .cloned()
            .ok_or_else(|| LocalError::TopicTypeMismatch {
                topic: name,
                expected: registered.type_name(),
                found: type_name::<Data>(),
            })
    }

    /// Get a publisher for `topic`
    pub fn advertise<Data: Clone + Send + 'static>(
        &self,
        topic: &str,
    ) -> Result<LocalPublisher<Data>, LocalError> {
        let publisher = self.publisher(topic)?;
        if publisher.is_closed() {
            return Err(LocalError::Closed);
        }
        Ok(publisher)
    }

    /// Get a polling subscriber for `topic`
    pub fn subscribe<Data: Clone + Send + 'static>(
        &self,
        topic: &str,
    ) -> Result<LocalSubscriber<Data>, LocalError> {
        Ok(self.publisher(topic)?.subscribe())
    }

    /// Get a polling subscriber for `topic` whose data expires after `ttl`
    pub fn subscribe_ttl<Data: Clone + Send + 'static>(
        &self,
        topic: &str,
        ttl: Duration,
    ) -> Result<LocalTTLSubscriber<Data>, LocalError> {
        Ok(self.publisher(topic)?.subscribe_ttl(ttl))
    }

    /// Register `handler` to be called for every message published on `topic`
    pub fn subscribe_callback<Data, F>(
        &self,
        topic: &str,
        queue_size: usize,
        handler: F,
    ) -> Result<LocalCallbackSubscriber<Data>, LocalError>
    where
        Data: Clone + Send + 'static,
        F: FnMut(Data) + Send + 'static,
    {
        self.publisher(topic)?.subscribe_callback(queue_size, handler)
    }

    /// Every registered topic with the type of data it carries, sorted by name
    pub fn topics(&self) -> Vec<(String, &'static str)> {
        lock(&self.topics)
            .iter()
            .map(|(name, topic)| (name.clone(), topic.type_name()))
            .collect()
    }

    /// Close the publisher of every registered topic
    pub fn close_all(&self) {
        for (name, topic) in lock(&self.topics).iter() {
            log::debug!("closing topic {}", name);
            topic.close();
        }
    }
}
