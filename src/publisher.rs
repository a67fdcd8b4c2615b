//! Domain event publishing over NATS.
//!
//! Publishing never fails the request that raised the event: a missing bus
//! or a publish error is logged and the operation carries on.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: async_nats::Client) -> Self { Self { nats: Some(nats) } }

    /// A publisher that only logs.
    pub fn disabled() -> Self { Self::default() }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let Some(client) = &self.nats else {
            debug!(subject, ?event, "event bus disabled, not publishing");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(subject, error = %e, "could not serialize event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            warn!(subject, error = %e, "failed to publish event");
        }
    }
}
