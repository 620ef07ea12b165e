//!
//! Publisher -> Subscriber Communication
//!
//! Publishers push data onto a topic so that subscribers can read
//! the data published on that topic.
//!

/// The basic publisher trait that enables the publishing of data
/// to some endpoint for subscribers to read.
pub trait Publisher {
    /// The data to be published by the publisher
    type Data;
    /// The error type from attempting to publish data
    type Error;

    /// Publish a piece of data to the endpoint for subscribers to read.
    fn publish(&mut self, data: Self::Data) -> Result<(), Self::Error>;
}

/// The basic subscriber trait that enables the polling of data
/// from some endpoint.
pub trait Subscriber {
    /// The type of data stored in the subscriber
    type Target;

    /// Update the current data in the subscriber and return a reference to the
    /// current data
    fn get(&mut self) -> &Self::Target;
}
