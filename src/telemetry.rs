//! Command analytics delivered through the event queue

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};

use tuist_cache::{CloudClient, CloudResponse, CloudResponseError, HttpResource};
use tuist_graph::Clock;
use tuist_queue::{QueueDispatching, QueueError, QueueEvent};

pub const COMMAND_EVENT_DISPATCHER: &str = "tuist.analytics";

/// Builds the event recorded once a command has run.
pub fn command_event(
    name: &str,
    duration: Duration,
    success: bool,
    is_ci: bool,
    clock: &dyn Clock,
) -> QueueEvent {
    let payload = json!({
        "name": name,
        "duration_ms": duration.as_millis() as u64,
        "success": success,
        "is_ci": is_ci,
        "tuist_version": env!("CARGO_PKG_VERSION"),
        "os": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "created_at": clock.now().to_rfc3339(),
    });
    QueueEvent::new(COMMAND_EVENT_DISPATCHER, payload, clock)
}

/// Posts command events to the cloud analytics endpoint.
pub struct CommandEventDispatcher {
    client: CloudClient,
}

impl CommandEventDispatcher {
    pub fn new(client: CloudClient) -> Self {
        CommandEventDispatcher { client }
    }
}

#[async_trait::async_trait]
impl QueueDispatching for CommandEventDispatcher {
    fn identifier(&self) -> &str {
        COMMAND_EVENT_DISPATCHER
    }

    async fn dispatch(&self, event: &QueueEvent) -> Result<(), QueueError> {
        let resource = HttpResource::<CloudResponse<Value>, CloudResponseError>::new(
            Method::POST,
            "/api/analytics",
        )
        .json_body(event.payload.clone());
        self.client
            .request(resource)
            .await
            .map_err(|e| QueueError::Dispatch(e.to_string()))?;
        tracing::debug!("Delivered command event {}", event.id);
        Ok(())
    }
}
