use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::model::{
    EarningsEntry, NewUser, ReferralOutcome, ReferralStats, ReferralTree, Registration,
    SystemStats, User,
};

/// Public API trait for the referrals module that other modules can use
#[async_trait]
pub trait ReferralsApi: Send + Sync {
    /// Register a user, distributing rewards up the chain when a code is given
    async fn register_user(&self, new_user: NewUser) -> anyhow::Result<Registration>;

    /// Distribute rewards for an already registered user
    async fn process_new_referral(
        &self,
        new_user_id: Uuid,
        referral_code: &str,
    ) -> anyhow::Result<ReferralOutcome>;

    async fn get_user(&self, id: Uuid) -> anyhow::Result<User>;

    async fn referral_tree(&self, user_id: Uuid) -> anyhow::Result<Option<ReferralTree>>;

    async fn referral_stats(&self, user_id: Uuid) -> anyhow::Result<ReferralStats>;

    /// Ancestors, nearest first
    async fn upline(&self, user_id: Uuid) -> anyhow::Result<Vec<User>>;

    /// Awards received, most recent first
    async fn earnings_breakdown(&self, user_id: Uuid) -> anyhow::Result<Vec<EarningsEntry>>;

    async fn network_size(&self, user_id: Uuid) -> anyhow::Result<u64>;

    async fn system_stats(&self) -> anyhow::Result<SystemStats>;
}
