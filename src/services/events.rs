//! Publishes domain events to NATS when it is configured.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Connects to `url`; a failed connection disables publishing.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::default() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "Connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                warn!(error = %e, %url, "NATS unavailable; events will only be logged");
                Self::default()
            }
        }
    }

    /// Delivery is best effort. Failures are logged and never surface to callers.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, %subject, "Could not encode event");
                    continue;
                }
            };
            match &self.nats {
                Some(client) => {
                    if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                        warn!(error = %e, %subject, "Event publish failed");
                    }
                }
                None => debug!(%subject, event = ?event, "Domain event"),
            }
        }
    }
}
