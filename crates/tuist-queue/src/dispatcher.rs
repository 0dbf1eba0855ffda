use crate::error::QueueError;
use crate::event::QueueEvent;

/// Delivers events of one kind, e.g. analytics to the cloud.
#[async_trait::async_trait]
pub trait QueueDispatching: Send + Sync {
    /// Matches [`QueueEvent::dispatcher_id`].
    fn identifier(&self) -> &str;

    async fn dispatch(&self, event: &QueueEvent) -> Result<(), QueueError>;

    /// Delivers an event read back from disk.
    async fn dispatch_persisted(&self, data: &[u8]) -> Result<(), QueueError> {
        let event: QueueEvent = serde_json::from_slice(data)?;
        self.dispatch(&event).await
    }
}
