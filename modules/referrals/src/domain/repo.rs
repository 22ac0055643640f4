use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::model::{Referral, User};

/// Port for the domain layer: the record store the engine reads and writes.
///
/// Lookups return `Ok(None)` or an empty list when nothing matches; only a
/// store failure is an `Err`. Writes fail on uniqueness violations and on
/// updates of a missing user.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_referral_code(&self, code: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// All users, in store iteration order.
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    /// Direct referrals: users whose `referred_by` equals `code`.
    async fn list_users_referred_by(&self, code: &str) -> anyhow::Result<Vec<User>>;
    async fn insert_user(&self, user: User) -> anyhow::Result<()>;
    /// Replace an existing user (matched by `user.id`).
    async fn update_user(&self, user: User) -> anyhow::Result<()>;

    /// Append an attribution record. Records are never updated.
    async fn insert_referral(&self, referral: Referral) -> anyhow::Result<()>;
    async fn list_referrals_by_referrer(&self, referrer_id: Uuid) -> anyhow::Result<Vec<Referral>>;
    async fn list_referrals(&self) -> anyhow::Result<Vec<Referral>>;
}
