use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::ReferralLevel;

/// Transport-agnostic domain event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralDomainEvent {
    UserRegistered {
        id: Uuid,
        at: DateTime<Utc>,
    },
    EarningsAwarded {
        referral_id: Uuid,
        referrer_id: Uuid,
        referred_user_id: Uuid,
        level: ReferralLevel,
        amount: u64,
        at: DateTime<Utc>,
    },
}
