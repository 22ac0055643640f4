use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::{events::ReferralDomainEvent, ports::EventPublisher};

/// Adapter: implements the domain port by fanning events out over a
/// broadcast channel. Publishing with no subscribers is not an error.
#[derive(Clone)]
pub struct BroadcastEventPublisher {
    tx: broadcast::Sender<ReferralDomainEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReferralDomainEvent> {
        self.tx.subscribe()
    }
}

impl EventPublisher<ReferralDomainEvent> for BroadcastEventPublisher {
    fn publish(&self, event: &ReferralDomainEvent) {
        if self.tx.send(event.clone()).is_err() {
            trace!("No event subscribers");
        }
    }
}
