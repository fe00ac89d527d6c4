//! RabbitMQ transport: a single topic exchange (`booking`), one exclusive
//! queue per subscriber bound to its routing keys (spec §6.2).

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};

use booking_core::BookingError;
use booking_domain::saga::SagaMessage;

use crate::{EventBus, Subscription};

const EXCHANGE: &str = "booking";

/// One connection, one channel for publishing; subscribers each open their
/// own channel so a slow consumer never backpressures publication.
pub struct AmqpBus {
    connection: Connection,
    publish_channel: Channel,
}

impl AmqpBus {
    #[tracing::instrument(skip(url))]
    pub async fn connect(url: &str) -> Result<Self, BookingError> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| BookingError::transport(format!("amqp connect failed: {e}")))?;
        tracing::info!("connected to rabbitmq, declaring exchange");
        let publish_channel = connection
            .create_channel()
            .await
            .map_err(|e| BookingError::transport(format!("amqp channel failed: {e}")))?;
        publish_channel
            .exchange_declare(
                EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BookingError::transport(format!("amqp exchange declare failed: {e}")))?;
        Ok(Self {
            connection,
            publish_channel,
        })
    }
}

#[async_trait]
impl EventBus for AmqpBus {
    #[tracing::instrument(skip(self, message), fields(routing_key = %message.event_name, correlation_id = %message.correlation_id))]
    async fn publish(&self, message: SagaMessage) -> Result<(), BookingError> {
        let routing_key = message.event_name.clone();
        let body = serde_json::to_vec(&message)
            .map_err(|e| BookingError::internal(format!("failed to serialize saga message: {e}")))?;

        // Fire-and-forget (spec §4.2): a publish failure is logged by the
        // caller and dropped, never surfaced as an order-state rollback.
        self.publish_channel
            .basic_publish(
                EXCHANGE,
                &routing_key,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default(),
            )
            .await
            .map_err(|e| BookingError::transport(format!("amqp publish failed: {e}")))?;
        Ok(())
    }

    async fn subscribe(&self, routing_keys: &[String]) -> Result<Box<dyn Subscription>, BookingError> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(|e| BookingError::transport(format!("amqp channel failed: {e}")))?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BookingError::transport(format!("amqp queue declare failed: {e}")))?;

        for key in routing_keys {
            channel
                .queue_bind(
                    queue.name().as_str(),
                    EXCHANGE,
                    key,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await
                .map_err(|e| BookingError::transport(format!("amqp queue bind failed: {e}")))?;
        }

        let consumer = channel
            .basic_consume(
                queue.name().as_str(),
                "booking-consumer",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BookingError::transport(format!("amqp consume failed: {e}")))?;

        Ok(Box::new(AmqpSubscription {
            channel,
            consumer,
        }))
    }
}

struct AmqpSubscription {
    channel: Channel,
    consumer: lapin::Consumer,
}

#[async_trait]
impl Subscription for AmqpSubscription {
    async fn recv(&mut self) -> Result<Option<SagaMessage>, BookingError> {
        let Some(delivery) = self.consumer.next().await else {
            return Ok(None);
        };
        let delivery = delivery.map_err(|e| BookingError::transport(format!("amqp delivery failed: {e}")))?;

        let message: SagaMessage = match serde_json::from_slice(&delivery.data) {
            Ok(message) => message,
            Err(e) => {
                // Poison message: never redeliver it into the same loop, so
                // one malformed body can't wedge the subscription.
                if let Err(nack_err) = self
                    .channel
                    .basic_nack(delivery.delivery_tag, BasicNackOptions { requeue: false, ..Default::default() })
                    .await
                {
                    tracing::error!(%nack_err, "amqp nack failed after deserialize error");
                }
                return Err(BookingError::internal(format!("failed to deserialize saga message: {e}")));
            }
        };

        self.channel
            .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| BookingError::transport(format!("amqp ack failed: {e}")))?;

        Ok(Some(message))
    }
}
