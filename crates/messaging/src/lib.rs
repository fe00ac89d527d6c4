//! The saga subsystem's message bus abstraction (spec §4.1, §6.2, §9
//! "capability abstractions": "a transport contract (publish/subscribe for
//! saga ... for 2PC)").
//!
//! A topic exchange keyed by the closed routing-key vocabulary in
//! `booking_domain::saga::message`. Production runs on RabbitMQ via `lapin`;
//! tests run on an in-process broadcast channel that speaks the same
//! contract, so the orchestrator and participants never special-case tests.

use async_trait::async_trait;

use booking_core::BookingError;
use booking_domain::saga::SagaMessage;

pub mod amqp;
pub mod in_memory;

pub use amqp::AmqpBus;
pub use in_memory::InMemoryBus;

/// Publish/subscribe contract every binary programs against.
///
/// At-least-once delivery is acceptable; consumers must be idempotent (spec
/// §9 "Idempotency of message handlers").
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, message: SagaMessage) -> Result<(), BookingError>;

    /// Bind a fresh queue to exactly the given routing keys and return a
    /// handle to consume from it.
    async fn subscribe(&self, routing_keys: &[String]) -> Result<Box<dyn Subscription>, BookingError>;
}

/// An open consumer handle bound to a fixed set of routing keys.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next message. `Ok(None)` means the underlying transport
    /// closed (e.g. broker connection dropped, or graceful shutdown).
    async fn recv(&mut self) -> Result<Option<SagaMessage>, BookingError>;
}
