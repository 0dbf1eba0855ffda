//! Persisted, retried background delivery of events

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod persistor;
pub mod queue;
pub mod retry;

#[cfg(test)]
pub mod tests;

pub use dispatcher::QueueDispatching;
pub use error::QueueError;
pub use event::{PersistedEvent, QueueEvent};
pub use persistor::{QueuePersisting, QueuePersistor};
pub use queue::AsyncQueue;
pub use retry::{Backoff, Exhausted, RetryPolicy};
