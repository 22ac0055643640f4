pub mod clock;
pub mod identity;

pub use clock::Clock;
pub use identity::{IdGenerator, ReferralCodeGenerator};

/// Output port: publish domain events (no knowledge of transport).
pub trait EventPublisher<E>: Send + Sync + 'static {
    fn publish(&self, event: &E);
}
