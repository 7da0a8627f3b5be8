//! Best-effort domain event publishing to NATS.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Publisher without a bus; events are only logged.
    pub fn disabled() -> Self { Self::default() }

    /// Publishes each event on its subject. Failures are logged and dropped.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            let Some(client) = &self.nats else {
                tracing::debug!(subject = %subject, "No event bus configured, event dropped");
                continue;
            };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!(error = %e, subject = %subject, "Failed to serialize event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(error = %e, subject = %subject, "Failed to publish event");
            }
        }
    }
}
