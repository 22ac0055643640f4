use std::sync::atomic::{AtomicU64, Ordering};

use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

use crate::domain::ports::{IdGenerator, ReferralCodeGenerator};

/// Random v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Monotonic identifiers `Uuid::from_u128(1)`, `from_u128(2)`, ...
/// Unique only within one instance: each generator starts over at 1, so
/// every writer to a shared store must use the same instance.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    last: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Uuid {
        let n = self.last.fetch_add(1, Ordering::Relaxed) + 1;
        Uuid::from_u128(n as u128)
    }
}

/// Uppercase alphanumeric codes of a fixed length.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    length: usize,
}

impl RandomCodeGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl ReferralCodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect()
    }
}
