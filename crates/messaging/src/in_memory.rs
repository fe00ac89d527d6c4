//! An in-process stand-in for the broker, used by tests (and by example
//! binaries run without RabbitMQ configured).

use async_trait::async_trait;
use tokio::sync::broadcast;

use booking_core::BookingError;
use booking_domain::saga::SagaMessage;

use crate::{EventBus, Subscription};

/// Every published message fans out to every subscriber; each subscriber
/// filters to the routing keys it bound, mirroring a topic-exchange queue
/// binding without needing a broker in tests.
#[derive(Clone)]
pub struct InMemoryBus {
    sender: broadcast::Sender<SagaMessage>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        let (sender, _receiver) = broadcast::channel(1024);
        Self { sender }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, message: SagaMessage) -> Result<(), BookingError> {
        // No active subscribers is not an error: spec §4.2 treats publish as
        // fire-and-forget.
        let _ = self.sender.send(message);
        Ok(())
    }

    async fn subscribe(&self, routing_keys: &[String]) -> Result<Box<dyn Subscription>, BookingError> {
        Ok(Box::new(InMemorySubscription {
            receiver: self.sender.subscribe(),
            routing_keys: routing_keys.to_vec(),
        }))
    }
}

struct InMemorySubscription {
    receiver: broadcast::Receiver<SagaMessage>,
    routing_keys: Vec<String>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn recv(&mut self) -> Result<Option<SagaMessage>, BookingError> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if self.routing_keys.iter().any(|k| k == &message.event_name) => {
                    return Ok(Some(message))
                }
                Ok(_unmatched) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_domain::saga::EventName;
    use booking_domain::ResourceKind;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_only_receives_bound_routing_keys() {
        let bus = InMemoryBus::new();
        let mut sub = bus
            .subscribe(&[EventName::ReserveCommand(ResourceKind::Hotel).as_routing_key()])
            .await
            .unwrap();

        bus.publish(SagaMessage::new(
            EventName::ReserveCommand(ResourceKind::Car),
            "order-1",
            json!({}),
        ))
        .await
        .unwrap();
        bus.publish(SagaMessage::new(
            EventName::ReserveCommand(ResourceKind::Hotel),
            "order-1",
            json!({}),
        ))
        .await
        .unwrap();

        let received = sub.recv().await.unwrap().unwrap();
        assert_eq!(received.event_name, "booking.command.reserve.room");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let bus = InMemoryBus::new();
        let result = bus
            .publish(SagaMessage::new(EventName::OrderBooked, "order-1", json!({})))
            .await;
        assert!(result.is_ok());
    }
}
