//! Domain event publishing over NATS.
//!
//! Without `NATS_URL` events are only logged at debug level. Publish failures
//! are logged and never fail the request that raised the event.

use crate::domain::events::DomainEvent;

const SUBJECT_PREFIX: &str = "storefront";

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else {
            return Self::default();
        };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, events will not be published");
                Self::default()
            }
        }
    }

    pub async fn publish(&self, event: DomainEvent) {
        let subject = subject_for(&event);
        let Some(client) = &self.nats else {
            tracing::debug!(%subject, ?event, "event not published (no NATS)");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(%subject, error = %e, "failed to serialize event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::error!(%subject, error = %e, "failed to publish event");
        }
    }
}

fn subject_for(event: &DomainEvent) -> String {
    format!("{SUBJECT_PREFIX}.{}", event.subject())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_subject() {
        let event = DomainEvent::UserRegistered { user_id: Uuid::nil() };
        assert_eq!(subject_for(&event), "storefront.user.registered");
    }

    #[tokio::test]
    async fn test_publish_without_nats_is_noop() {
        EventPublisher::default().publish(DomainEvent::UserRegistered { user_id: Uuid::nil() }).await;
        let publisher = EventPublisher::connect(None).await;
        publisher.publish(DomainEvent::UserRegistered { user_id: Uuid::nil() }).await;
    }
}
