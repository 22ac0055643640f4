#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use referrals::contract::model::{EarningsByLevel, NewUser, User};
use referrals::domain::events::ReferralDomainEvent;
use referrals::domain::ports::{EventPublisher, IdGenerator, ReferralCodeGenerator};
use referrals::domain::repo::RecordStore;
use referrals::domain::service::{Service, ServiceConfig};
use referrals::infra::clock::ManualClock;
use referrals::infra::ids::SequentialIdGenerator;
use referrals::infra::storage::InMemoryRecordStore;

/// Codes `REF0001`, `REF0002`, ... so tests can predict them.
#[derive(Default)]
pub struct SequentialCodes(AtomicU64);

impl ReferralCodeGenerator for SequentialCodes {
    fn generate(&self) -> String {
        format!("REF{:04}", self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Always proposes the same code.
pub struct FixedCode(pub &'static str);

impl ReferralCodeGenerator for FixedCode {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}

/// Keeps every published event.
#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<ReferralDomainEvent>>,
}

impl EventPublisher<ReferralDomainEvent> for RecordingPublisher {
    fn publish(&self, event: &ReferralDomainEvent) {
        self.events.lock().push(event.clone());
    }
}

pub struct Harness {
    pub store: Arc<InMemoryRecordStore>,
    pub ids: Arc<SequentialIdGenerator>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingPublisher>,
    pub service: Service,
}

pub fn harness() -> Harness {
    harness_with(ServiceConfig::default())
}

pub fn harness_with(config: ServiceConfig) -> Harness {
    let store = Arc::new(InMemoryRecordStore::new());
    harness_over(store.clone(), store, Arc::new(SequentialCodes::default()), config)
}

/// Build a harness whose service talks to `service_store`, while `store`
/// stays available for seeding and inspection.
pub fn harness_over(
    store: Arc<InMemoryRecordStore>,
    service_store: Arc<dyn RecordStore>,
    codes: Arc<dyn ReferralCodeGenerator>,
    config: ServiceConfig,
) -> Harness {
    build(store, service_store, codes, config, Duration::seconds(1))
}

/// Harness whose clock never moves, so every record shares one timestamp.
pub fn frozen_harness() -> Harness {
    let store = Arc::new(InMemoryRecordStore::new());
    build(
        store.clone(),
        store,
        Arc::new(SequentialCodes::default()),
        ServiceConfig::default(),
        Duration::zero(),
    )
}

fn build(
    store: Arc<InMemoryRecordStore>,
    service_store: Arc<dyn RecordStore>,
    codes: Arc<dyn ReferralCodeGenerator>,
    config: ServiceConfig,
    tick: Duration,
) -> Harness {
    let ids = Arc::new(SequentialIdGenerator::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        tick,
    ));
    let events = Arc::new(RecordingPublisher::default());
    let service = Service::new(
        service_store,
        ids.clone(),
        codes,
        clock.clone(),
        events.clone(),
        config,
    );
    Harness {
        store,
        ids,
        clock,
        events,
        service,
    }
}

impl Harness {
    /// Insert a user straight into the store, without any awards.
    pub async fn seed(&self, name: &str, referred_by: Option<&str>) -> User {
        let user = User {
            id: self.ids.next_id(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            referral_code: format!("CODE-{}", name.to_uppercase()),
            referred_by: referred_by.map(str::to_string),
            total_earnings: 0,
            earnings_by_level: EarningsByLevel::default(),
            created_at: Utc::now(),
        };
        self.store.insert_user(user.clone()).await.unwrap();
        user
    }

    /// Seed a straight chain; element 0 is the root, each next one is
    /// referred by the previous.
    pub async fn seed_chain(&self, len: usize) -> Vec<User> {
        let mut chain: Vec<User> = Vec::with_capacity(len);
        for i in 0..len {
            let parent = chain.last().map(|u| u.referral_code.clone());
            chain.push(self.seed(&format!("u{i}"), parent.as_deref()).await);
        }
        chain
    }

    /// Register through the service, as the identity layer would.
    pub async fn register(&self, name: &str, code: Option<&str>) -> User {
        self.service
            .register_user(new_user(name, code))
            .await
            .unwrap()
            .user
    }

    pub async fn reload(&self, id: Uuid) -> User {
        self.store.find_user(id).await.unwrap().unwrap()
    }
}

pub fn new_user(name: &str, code: Option<&str>) -> NewUser {
    NewUser {
        username: name.to_string(),
        email: format!("{name}@example.com"),
        referral_code: code.map(str::to_string),
    }
}
