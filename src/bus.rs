//! Publishing of domain events to NATS.
//!
//! The bus is optional: without `NATS_URL` events are only logged. A failed
//! publish never fails the request that produced the event.

use std::fmt;

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventBus {
    client: Option<async_nats::Client>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").field("connected", &self.client.is_some()).finish()
    }
}

impl EventBus {
    pub fn new(client: Option<async_nats::Client>) -> Self { Self { client } }

    pub fn disabled() -> Self { Self::default() }

    /// Connects to `url`, falling back to a disabled bus on failure.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(url, "connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "NATS unavailable, events will not be published");
                Self::disabled()
            }
        }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let subject = event.subject();
        let Some(client) = &self.client else {
            tracing::debug!(subject, ?event, "event bus disabled, dropping event");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(subject, error = %e, "failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
            tracing::warn!(subject, error = %e, "failed to publish event");
        }
    }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in &events {
            self.publish(event).await;
        }
    }
}
