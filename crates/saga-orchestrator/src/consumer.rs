//! The orchestrator's bus consumer: one task per reply routing key, all
//! funneling into `Orchestrator::process_saga_event` (spec §2 "Orchestrator
//! ... listen for reply events").

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use booking_domain::saga::message::EventName;
use booking_domain::ResourceKind;
use booking_messaging::EventBus;

use crate::orchestrator::Orchestrator;

/// Spawn one consumer loop over the six reply routing keys (spec §6.2: "the
/// orchestrator subscribes to queues bound to the six reply routing keys").
/// Returns the task handle so the caller can await it during shutdown.
pub fn spawn(
    bus: Arc<dyn EventBus>,
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let routing_keys: Vec<String> = ResourceKind::all()
            .into_iter()
            .flat_map(|kind| [EventName::Reserved(kind).as_routing_key(), EventName::ReservationFailed(kind).as_routing_key()])
            .collect();

        let mut subscription = match bus.subscribe(&routing_keys).await {
            Ok(sub) => sub,
            Err(err) => {
                tracing::error!(%err, "failed to subscribe to saga reply events");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("saga reply consumer shutting down");
                    return;
                }
                message = subscription.recv() => {
                    match message {
                        Ok(Some(message)) => {
                            if let Err(err) = orchestrator.process_saga_event(message).await {
                                tracing::warn!(%err, "failed to process saga reply event");
                            }
                        }
                        Ok(None) => {
                            tracing::warn!("saga reply subscription closed");
                            return;
                        }
                        Err(err) => {
                            tracing::error!(%err, "error receiving saga reply event");
                        }
                    }
                }
            }
        }
    })
}
