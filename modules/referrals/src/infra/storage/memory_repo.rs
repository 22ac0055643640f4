//! In-process record store for the domain port.
//!
//! Users and referral records live in insertion-ordered vectors with hash
//! indexes for the unique keys, so `list_users` iterates in registration
//! order. Each call takes the lock once; nothing spans calls, so a
//! multi-step service operation is not isolated from concurrent writers.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context};
use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::contract::model::{Referral, User};
use crate::domain::repo::RecordStore;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    by_id: HashMap<Uuid, usize>,
    by_code: HashMap<String, usize>,
    by_username: HashMap<String, usize>,
    by_email: HashMap<String, usize>,
    referrals: Vec<Referral>,
    referral_ids: HashSet<Uuid>,
}

impl Tables {
    fn user_at(&self, idx: Option<&usize>) -> Option<User> {
        idx.and_then(|&i| self.users.get(i)).cloned()
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_code.clear();
        self.by_username.clear();
        self.by_email.clear();
        for (i, u) in self.users.iter().enumerate() {
            self.by_id.insert(u.id, i);
            self.by_code.insert(u.referral_code.clone(), i);
            self.by_username.insert(u.username.clone(), i);
            self.by_email.insert(u.email.clone(), i);
        }
    }

    /// Uniqueness check for `user` against every row except `skip`.
    fn check_unique(&self, user: &User, skip: Option<usize>) -> anyhow::Result<()> {
        let taken = |index: &HashMap<String, usize>, key: &str| {
            index.get(key).is_some_and(|&i| Some(i) != skip)
        };
        if taken(&self.by_code, &user.referral_code) {
            bail!("referral code '{}' already in use", user.referral_code);
        }
        if taken(&self.by_username, &user.username) {
            bail!("username '{}' already in use", user.username);
        }
        if taken(&self.by_email, &user.email) {
            bail!("email '{}' already in use", user.email);
        }
        Ok(())
    }
}

/// Record store kept in process memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<Tables>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Administrative delete. Referral records naming the user are kept.
    /// Returns true if a user was removed.
    pub fn remove_user(&self, id: Uuid) -> bool {
        let mut t = self.tables.write();
        let Some(idx) = t.by_id.get(&id).copied() else {
            return false;
        };
        t.users.remove(idx);
        t.reindex();
        true
    }

    pub fn user_count(&self) -> usize {
        self.tables.read().users.len()
    }

    pub fn referral_count(&self) -> usize {
        self.tables.read().referrals.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.read();
        Ok(t.user_at(t.by_id.get(&id)))
    }

    async fn find_user_by_referral_code(&self, code: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read();
        Ok(t.user_at(t.by_code.get(code)))
    }

    async fn find_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read();
        Ok(t.user_at(t.by_username.get(username)))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read();
        Ok(t.user_at(t.by_email.get(email)))
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.read().users.clone())
    }

    async fn list_users_referred_by(&self, code: &str) -> anyhow::Result<Vec<User>> {
        Ok(self
            .tables
            .read()
            .users
            .iter()
            .filter(|u| u.referred_by.as_deref() == Some(code))
            .cloned()
            .collect())
    }

    async fn insert_user(&self, user: User) -> anyhow::Result<()> {
        let mut t = self.tables.write();
        if t.by_id.contains_key(&user.id) {
            bail!("user {} already exists", user.id);
        }
        t.check_unique(&user, None).context("insert_user failed")?;

        let idx = t.users.len();
        t.by_id.insert(user.id, idx);
        t.by_code.insert(user.referral_code.clone(), idx);
        t.by_username.insert(user.username.clone(), idx);
        t.by_email.insert(user.email.clone(), idx);
        t.users.push(user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> anyhow::Result<()> {
        let mut t = self.tables.write();
        let idx = t
            .by_id
            .get(&user.id)
            .copied()
            .with_context(|| format!("update_user failed: user {} not found", user.id))?;
        t.check_unique(&user, Some(idx))
            .context("update_user failed")?;

        let rekey = {
            let old = &t.users[idx];
            old.referral_code != user.referral_code
                || old.username != user.username
                || old.email != user.email
        };
        t.users[idx] = user;
        if rekey {
            t.reindex();
        }
        Ok(())
    }

    async fn insert_referral(&self, referral: Referral) -> anyhow::Result<()> {
        let mut t = self.tables.write();
        if !t.referral_ids.insert(referral.id) {
            bail!("referral {} already exists", referral.id);
        }
        t.referrals.push(referral);
        Ok(())
    }

    async fn list_referrals_by_referrer(&self, referrer_id: Uuid) -> anyhow::Result<Vec<Referral>> {
        Ok(self
            .tables
            .read()
            .referrals
            .iter()
            .filter(|r| r.referrer_id == referrer_id)
            .cloned()
            .collect())
    }

    async fn list_referrals(&self) -> anyhow::Result<Vec<Referral>> {
        Ok(self.tables.read().referrals.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::{EarningsByLevel, ReferralLevel};
    use chrono::Utc;

    fn user(name: &str, referred_by: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            referral_code: format!("CODE-{name}"),
            referred_by: referred_by.map(str::to_string),
            total_earnings: 0,
            earnings_by_level: EarningsByLevel::default(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lookups_by_every_key() {
        let store = InMemoryRecordStore::new();
        let alice = user("alice", None);
        store.insert_user(alice.clone()).await.unwrap();

        assert_eq!(store.find_user(alice.id).await.unwrap(), Some(alice.clone()));
        assert_eq!(
            store.find_user_by_referral_code("CODE-alice").await.unwrap(),
            Some(alice.clone())
        );
        assert_eq!(
            store.find_user_by_username("alice").await.unwrap(),
            Some(alice.clone())
        );
        assert_eq!(
            store.find_user_by_email("alice@example.com").await.unwrap(),
            Some(alice)
        );
        assert!(store.find_user(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.find_user_by_referral_code("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_keys() {
        let store = InMemoryRecordStore::new();
        store.insert_user(user("alice", None)).await.unwrap();

        let mut dup_name = user("alice", None);
        dup_name.email = "other@example.com".into();
        dup_name.referral_code = "OTHER".into();
        assert!(store.insert_user(dup_name).await.is_err());

        let mut dup_code = user("bob", None);
        dup_code.referral_code = "CODE-alice".into();
        assert!(store.insert_user(dup_code).await.is_err());

        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn direct_referrals_keep_insertion_order() {
        let store = InMemoryRecordStore::new();
        store.insert_user(user("root", None)).await.unwrap();
        for name in ["c1", "c2", "c3"] {
            store
                .insert_user(user(name, Some("CODE-root")))
                .await
                .unwrap();
        }
        store
            .insert_user(user("grandchild", Some("CODE-c1")))
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_users_referred_by("CODE-root")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn update_requires_existing_user() {
        let store = InMemoryRecordStore::new();
        let mut alice = user("alice", None);
        assert!(store.update_user(alice.clone()).await.is_err());

        store.insert_user(alice.clone()).await.unwrap();
        assert!(alice.credit(ReferralLevel::Level1, 100));
        store.update_user(alice.clone()).await.unwrap();
        assert_eq!(
            store.find_user(alice.id).await.unwrap().unwrap().total_earnings,
            100
        );
    }

    #[tokio::test]
    async fn remove_user_reindexes() {
        let store = InMemoryRecordStore::new();
        let a = user("a", None);
        let b = user("b", None);
        store.insert_user(a.clone()).await.unwrap();
        store.insert_user(b.clone()).await.unwrap();

        assert!(store.remove_user(a.id));
        assert!(!store.remove_user(a.id));
        assert!(store.find_user(a.id).await.unwrap().is_none());
        assert_eq!(store.find_user(b.id).await.unwrap(), Some(b.clone()));
        assert_eq!(
            store.find_user_by_referral_code("CODE-b").await.unwrap(),
            Some(b)
        );
    }

    #[tokio::test]
    async fn referral_ids_are_unique() {
        let store = InMemoryRecordStore::new();
        let r = Referral {
            id: Uuid::new_v4(),
            referrer_id: Uuid::new_v4(),
            referred_user_id: Uuid::new_v4(),
            level: ReferralLevel::Level1,
            amount: 100,
            created_at: Utc::now(),
        };
        store.insert_referral(r.clone()).await.unwrap();
        assert!(store.insert_referral(r.clone()).await.is_err());
        assert_eq!(store.referral_count(), 1);
        assert_eq!(
            store.list_referrals_by_referrer(r.referrer_id).await.unwrap(),
            vec![r]
        );
    }
}
