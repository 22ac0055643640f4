use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    EarningsEntry, NewUser, Referral, ReferralLevel, ReferralOutcome, ReferralStats, ReferralTree,
    Registration, SystemStats, User,
};
use crate::domain::error::DomainError;
use crate::domain::events::ReferralDomainEvent;
use crate::domain::ports::{Clock, EventPublisher, IdGenerator, ReferralCodeGenerator};
use crate::domain::repo::RecordStore;
use crate::domain::rewards::reward_for;

/// Referral engine: registration hand-off, multi-level reward distribution
/// and tree/statistics queries. Depends only on ports, not on infra types.
///
/// Writes are not atomic across a chain: awards committed before a failure
/// stay committed, and concurrent onboarding through a shared referrer can
/// lose updates unless the store serializes them.
#[derive(Clone)]
pub struct Service {
    store: Arc<dyn RecordStore>,
    ids: Arc<dyn IdGenerator>,
    codes: Arc<dyn ReferralCodeGenerator>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventPublisher<ReferralDomainEvent>>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound on any chain or tree traversal.
    pub max_chain_depth: usize,
    pub top_earners_limit: usize,
    pub max_username_length: usize,
    /// Referral code candidates tried before registration gives up.
    pub max_code_attempts: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: 1024,
            top_earners_limit: 10,
            max_username_length: 64,
            max_code_attempts: 16,
        }
    }
}

fn db_err(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(
        store: Arc<dyn RecordStore>,
        ids: Arc<dyn IdGenerator>,
        codes: Arc<dyn ReferralCodeGenerator>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventPublisher<ReferralDomainEvent>>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            ids,
            codes,
            clock,
            events,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[instrument(
        name = "referrals.service.register_user",
        skip(self),
        fields(username = %new_user.username, email = %new_user.email)
    )]
    pub async fn register_user(&self, new_user: NewUser) -> Result<Registration, DomainError> {
        info!("Registering new user");

        let username = new_user.username.trim().to_string();
        let email = new_user.email.trim().to_string();
        self.validate_username(&username)?;
        self.validate_email(&email)?;

        if self
            .store
            .find_user_by_username(&username)
            .await
            .map_err(db_err)?
            .is_some()
        {
            return Err(DomainError::username_already_exists(username));
        }
        if self
            .store
            .find_user_by_email(&email)
            .await
            .map_err(db_err)?
            .is_some()
        {
            return Err(DomainError::email_already_exists(email));
        }

        // An unknown code fails the registration before anything is written.
        if let Some(code) = new_user.referral_code.as_deref() {
            if self
                .store
                .find_user_by_referral_code(code)
                .await
                .map_err(db_err)?
                .is_none()
            {
                return Err(DomainError::referrer_not_found(code));
            }
        }

        let user = User {
            id: self.ids.next_id(),
            username,
            email,
            referral_code: self.unique_referral_code().await?,
            referred_by: new_user.referral_code.clone(),
            total_earnings: 0,
            earnings_by_level: Default::default(),
            created_at: self.clock.now(),
        };

        self.store
            .insert_user(user.clone())
            .await
            .map_err(db_err)?;

        self.events.publish(&ReferralDomainEvent::UserRegistered {
            id: user.id,
            at: user.created_at,
        });
        info!(user_id = %user.id, referral_code = %user.referral_code, "User registered");

        let outcome = match new_user.referral_code.as_deref() {
            Some(code) => Some(self.process_new_referral(user.id, code).await?),
            None => None,
        };

        Ok(Registration { user, outcome })
    }

    /// Reward every ancestor of `new_user_id`, starting with the owner of
    /// `referral_code` at level 1.
    ///
    /// A code further up the chain that no longer resolves ends the walk
    /// quietly, and a referrer that vanishes before its award is skipped;
    /// both still count as success.
    #[instrument(
        name = "referrals.service.process_new_referral",
        skip(self),
        fields(new_user_id = %new_user_id)
    )]
    pub async fn process_new_referral(
        &self,
        new_user_id: Uuid,
        referral_code: &str,
    ) -> Result<ReferralOutcome, DomainError> {
        info!("Distributing referral rewards");

        let new_user = self
            .store
            .find_user(new_user_id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::user_not_found(new_user_id))?;

        let direct = self
            .store
            .find_user_by_referral_code(referral_code)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::referrer_not_found(referral_code))?;

        if direct.id == new_user.id {
            return Err(DomainError::self_referral(referral_code));
        }

        let mut awards = Vec::new();
        let mut level = ReferralLevel::Level1;
        let mut next = Some(direct);

        while let Some(referrer) = next.take() {
            if level.depth() as usize > self.config.max_chain_depth {
                warn!(
                    max = self.config.max_chain_depth,
                    awarded = awards.len(),
                    "Referral chain exceeds depth limit, aborting"
                );
                return Err(DomainError::chain_depth_exceeded(self.config.max_chain_depth));
            }

            if let Some(record) = self
                .award_earnings(referrer.id, new_user.id, level, reward_for(level))
                .await?
            {
                awards.push(record);
            }

            next = match referrer.referred_by.as_deref() {
                Some(code) => {
                    let upstream = self
                        .store
                        .find_user_by_referral_code(code)
                        .await
                        .map_err(db_err)?;
                    if upstream.is_none() {
                        debug!(code, level = level.depth(), "Referral code does not resolve, chain ends");
                    }
                    upstream
                }
                None => None,
            };
            level = level.next();
        }

        let outcome = ReferralOutcome {
            new_user_id: new_user.id,
            awards,
        };
        info!(
            awards = outcome.awards.len(),
            total = outcome.total_awarded(),
            "Referral rewards distributed"
        );
        Ok(outcome)
    }

    /// Credit `amount` to the referrer and append the attribution record.
    /// Returns `Ok(None)` without writing anything if the referrer is gone,
    /// and fails before writing if the credit would overflow. `level` is
    /// normalized first, so `LevelNPlus(2)` is recorded as `Level2`.
    #[instrument(
        name = "referrals.service.award_earnings",
        skip(self),
        fields(referrer_id = %referrer_id, level = level.depth())
    )]
    pub async fn award_earnings(
        &self,
        referrer_id: Uuid,
        referred_user_id: Uuid,
        level: ReferralLevel,
        amount: u64,
    ) -> Result<Option<Referral>, DomainError> {
        let level = level.normalized();
        let Some(mut referrer) = self.store.find_user(referrer_id).await.map_err(db_err)? else {
            debug!("Referrer no longer exists, skipping award");
            return Ok(None);
        };

        if !referrer.credit(level, amount) {
            warn!(amount, "Award would overflow referrer earnings");
            return Err(DomainError::earnings_overflow(referrer_id, amount));
        }
        self.store.update_user(referrer).await.map_err(db_err)?;

        let record = Referral {
            id: self.ids.next_id(),
            referrer_id,
            referred_user_id,
            level,
            amount,
            created_at: self.clock.now(),
        };
        self.store
            .insert_referral(record.clone())
            .await
            .map_err(db_err)?;

        self.events.publish(&ReferralDomainEvent::EarningsAwarded {
            referral_id: record.id,
            referrer_id,
            referred_user_id,
            level,
            amount,
            at: record.created_at,
        });
        debug!(amount, "Earnings awarded");
        Ok(Some(record))
    }

    #[instrument(name = "referrals.service.get_user", skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        debug!("Getting user by id");
        self.store
            .find_user(id)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "referrals.service.get_user_by_referral_code", skip(self))]
    pub async fn get_user_by_referral_code(&self, code: &str) -> Result<User, DomainError> {
        self.store
            .find_user_by_referral_code(code)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::referrer_not_found(code))
    }

    /// Full descendant tree of `user_id`; `None` if the user does not exist.
    #[instrument(name = "referrals.service.build_referral_tree", skip(self), fields(user_id = %user_id))]
    pub async fn build_referral_tree(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ReferralTree>, DomainError> {
        let Some(root) = self.store.find_user(user_id).await.map_err(db_err)? else {
            debug!("Root user not found");
            return Ok(None);
        };
        let tree = self.grow_tree(root).await?;
        debug!(size = tree.descendant_count(), "Referral tree built");
        Ok(Some(tree))
    }

    #[instrument(name = "referrals.service.get_referral_stats", skip(self), fields(user_id = %user_id))]
    pub async fn get_referral_stats(&self, user_id: Uuid) -> Result<ReferralStats, DomainError> {
        Ok(self
            .build_referral_tree(user_id)
            .await?
            .map(|tree| ReferralStats::from_tree(&tree))
            .unwrap_or_default())
    }

    /// Ancestors of `user_id`, nearest first. Stops quietly at a code that
    /// does not resolve.
    #[instrument(name = "referrals.service.get_upline", skip(self), fields(user_id = %user_id))]
    pub async fn get_upline(&self, user_id: Uuid) -> Result<Vec<User>, DomainError> {
        let Some(user) = self.store.find_user(user_id).await.map_err(db_err)? else {
            return Ok(Vec::new());
        };

        let mut upline: Vec<User> = Vec::new();
        let mut next_code = user.referred_by;
        while let Some(code) = next_code.take() {
            match self
                .store
                .find_user_by_referral_code(&code)
                .await
                .map_err(db_err)?
            {
                Some(ancestor) => {
                    if upline.len() >= self.config.max_chain_depth {
                        warn!(max = self.config.max_chain_depth, "Upline exceeds depth limit");
                        return Err(DomainError::chain_depth_exceeded(
                            self.config.max_chain_depth,
                        ));
                    }
                    next_code = ancestor.referred_by.clone();
                    upline.push(ancestor);
                }
                None => debug!(code = %code, "Referral code does not resolve, upline ends"),
            }
        }
        Ok(upline)
    }

    /// Awards received by `user_id`, most recent first, each joined with the
    /// referred user's record. Equal timestamps are ordered by reverse store
    /// order, so the last record written comes first.
    #[instrument(name = "referrals.service.get_earnings_breakdown", skip(self), fields(user_id = %user_id))]
    pub async fn get_earnings_breakdown(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<EarningsEntry>, DomainError> {
        let mut records = self
            .store
            .list_referrals_by_referrer(user_id)
            .await
            .map_err(db_err)?;
        records.reverse();
        // stable: ties keep the reversed store order
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut entries = Vec::with_capacity(records.len());
        for referral in records {
            let referred_user = self
                .store
                .find_user(referral.referred_user_id)
                .await
                .map_err(db_err)?;
            entries.push(EarningsEntry {
                referral,
                referred_user,
            });
        }
        Ok(entries)
    }

    #[instrument(name = "referrals.service.get_network_size", skip(self), fields(user_id = %user_id))]
    pub async fn get_network_size(&self, user_id: Uuid) -> Result<u64, DomainError> {
        Ok(self
            .build_referral_tree(user_id)
            .await?
            .map(|tree| tree.descendant_count())
            .unwrap_or(0))
    }

    #[instrument(name = "referrals.service.get_system_stats", skip(self))]
    pub async fn get_system_stats(&self) -> Result<SystemStats, DomainError> {
        let users = self.store.list_users().await.map_err(db_err)?;
        let referrals = self.store.list_referrals().await.map_err(db_err)?;

        let mut stats = SystemStats {
            total_users: users.len() as u64,
            total_referrals: referrals.len() as u64,
            ..Default::default()
        };
        for user in &users {
            stats.total_earnings = stats.total_earnings.saturating_add(user.total_earnings);
            stats.earnings_by_level.accumulate(&user.earnings_by_level);
        }

        // stable sort: ties keep store order
        let mut ranked = users;
        ranked.sort_by(|a, b| b.total_earnings.cmp(&a.total_earnings));
        ranked.truncate(self.config.top_earners_limit);
        stats.top_earners = ranked;

        debug!(
            users = stats.total_users,
            referrals = stats.total_referrals,
            "System stats computed"
        );
        Ok(stats)
    }

    // --- traversal helpers ---

    /// Breadth-first discovery of the downline, then bottom-up assembly.
    /// Nodes are discovered after their parent, so walking the arena in
    /// reverse always finds a node's children already built.
    async fn grow_tree(&self, root: User) -> Result<ReferralTree, DomainError> {
        let mut users = vec![root];
        let mut parent_of: Vec<usize> = vec![0];
        let mut frontier = vec![0usize];
        let mut depth = 0usize;

        while !frontier.is_empty() {
            depth += 1;
            let mut discovered = Vec::new();
            for &idx in &frontier {
                let children = self
                    .store
                    .list_users_referred_by(&users[idx].referral_code)
                    .await
                    .map_err(db_err)?;
                for child in children {
                    users.push(child);
                    parent_of.push(idx);
                    discovered.push(users.len() - 1);
                }
            }
            if !discovered.is_empty() && depth > self.config.max_chain_depth {
                warn!(max = self.config.max_chain_depth, "Referral tree exceeds depth limit");
                return Err(DomainError::chain_depth_exceeded(self.config.max_chain_depth));
            }
            frontier = discovered;
        }

        let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); users.len()];
        for (idx, &parent) in parent_of.iter().enumerate().skip(1) {
            children_of[parent].push(idx);
        }

        let mut built: Vec<Option<ReferralTree>> = Vec::with_capacity(users.len());
        built.resize_with(users.len(), || None);
        for (idx, user) in users.into_iter().enumerate().rev() {
            let children = children_of[idx]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[idx] = Some(ReferralTree { user, children });
        }

        built
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| DomainError::database("referral tree lost its root"))
    }

    async fn unique_referral_code(&self) -> Result<String, DomainError> {
        for _ in 0..self.config.max_code_attempts {
            let candidate = self.codes.generate();
            if self
                .store
                .find_user_by_referral_code(&candidate)
                .await
                .map_err(db_err)?
                .is_none()
            {
                return Ok(candidate);
            }
            debug!("Referral code collision, retrying");
        }
        Err(DomainError::referral_code_exhausted(
            self.config.max_code_attempts,
        ))
    }

    // --- validation helpers ---

    fn validate_username(&self, username: &str) -> Result<(), DomainError> {
        if username.is_empty() {
            return Err(DomainError::empty_username());
        }
        let len = username.chars().count();
        if len > self.config.max_username_length {
            return Err(DomainError::username_too_long(
                len,
                self.config.max_username_length,
            ));
        }
        Ok(())
    }

    fn validate_email(&self, email: &str) -> Result<(), DomainError> {
        if email.is_empty() || !email.contains('@') || !email.contains('.') {
            return Err(DomainError::invalid_email(email.to_string()));
        }
        Ok(())
    }
}
