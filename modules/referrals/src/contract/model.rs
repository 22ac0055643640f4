use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered user and its node in the referral tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Public token other users register with to join this user's downline.
    pub referral_code: String,
    /// Referral code of this user's direct referrer; `None` for roots.
    pub referred_by: Option<String>,
    pub total_earnings: u64,
    pub earnings_by_level: EarningsByLevel,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Add `amount` to the total and to the bucket `level` falls into.
    /// Returns `false` and leaves the user untouched if either would overflow.
    #[must_use]
    pub fn credit(&mut self, level: ReferralLevel, amount: u64) -> bool {
        let Some(total) = self.total_earnings.checked_add(amount) else {
            return false;
        };
        let mut buckets = self.earnings_by_level;
        if !buckets.credit(level, amount) {
            return false;
        }
        self.total_earnings = total;
        self.earnings_by_level = buckets;
        true
    }
}

/// Data for registering a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Code of the user that onboarded this one, if any.
    pub referral_code: Option<String>,
}

/// Distance from a referred user up to the ancestor being rewarded.
///
/// Every level from 4 upward shares one bucket and one reward, but keeps its
/// own number for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferralLevel {
    Level1,
    Level2,
    Level3,
    /// Depth 4 or more when built by `from_depth`. Other values are
    /// normalized before they are recorded or credited.
    LevelNPlus(u32),
}

impl ReferralLevel {
    /// Level for an ancestor `depth` steps above the referred user.
    /// Depth 0 is not a level and is clamped to `Level1`.
    pub fn from_depth(depth: u32) -> Self {
        match depth {
            0 | 1 => Self::Level1,
            2 => Self::Level2,
            3 => Self::Level3,
            n => Self::LevelNPlus(n),
        }
    }

    pub fn depth(self) -> u32 {
        match self {
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
            Self::LevelNPlus(n) => n,
        }
    }

    /// The level one step further up the chain.
    pub fn next(self) -> Self {
        Self::from_depth(self.depth().saturating_add(1))
    }

    /// Canonical form: `LevelNPlus(2)` becomes `Level2`, `LevelNPlus(0)`
    /// becomes `Level1`.
    pub fn normalized(self) -> Self {
        Self::from_depth(self.depth())
    }
}

/// Earnings split by level bucket. Levels 4 and beyond share `level4_plus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EarningsByLevel {
    pub level1: u64,
    pub level2: u64,
    pub level3: u64,
    pub level4_plus: u64,
}

impl EarningsByLevel {
    /// Returns `false` without changing anything if the bucket would overflow.
    #[must_use]
    pub fn credit(&mut self, level: ReferralLevel, amount: u64) -> bool {
        let bucket = match level.normalized() {
            ReferralLevel::Level1 => &mut self.level1,
            ReferralLevel::Level2 => &mut self.level2,
            ReferralLevel::Level3 => &mut self.level3,
            ReferralLevel::LevelNPlus(_) => &mut self.level4_plus,
        };
        match bucket.checked_add(amount) {
            Some(sum) => {
                *bucket = sum;
                true
            }
            None => false,
        }
    }

    /// Bucket sum, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.level1
            .saturating_add(self.level2)
            .saturating_add(self.level3)
            .saturating_add(self.level4_plus)
    }

    /// Bucket-wise sum for system-wide aggregates, saturating per bucket.
    pub fn accumulate(&mut self, other: &EarningsByLevel) {
        self.level1 = self.level1.saturating_add(other.level1);
        self.level2 = self.level2.saturating_add(other.level2);
        self.level3 = self.level3.saturating_add(other.level3);
        self.level4_plus = self.level4_plus.saturating_add(other.level4_plus);
    }
}

/// Immutable attribution record: one per (referrer, referred user, level).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_user_id: Uuid,
    pub level: ReferralLevel,
    pub amount: u64,
    pub created_at: DateTime<Utc>,
}

/// Result of distributing rewards for one onboarded user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralOutcome {
    pub new_user_id: Uuid,
    /// Records written, nearest referrer first.
    pub awards: Vec<Referral>,
}

impl ReferralOutcome {
    pub fn total_awarded(&self) -> u64 {
        self.awards.iter().map(|r| r.amount).sum()
    }
}

/// Result of a registration hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user: User,
    /// Present when the user registered with a referral code.
    pub outcome: Option<ReferralOutcome>,
}

/// Descendant tree rooted at `user`, rebuilt on demand from user records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralTree {
    pub user: User,
    /// Direct referrals, in store order.
    pub children: Vec<ReferralTree>,
}

impl ReferralTree {
    pub fn leaf(user: User) -> Self {
        Self {
            user,
            children: Vec::new(),
        }
    }

    /// Pre-order walk; `visit` receives each node with its depth (root = 0).
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(u32, &ReferralTree),
    {
        let mut stack = vec![(0u32, self)];
        while let Some((depth, node)) = stack.pop() {
            visit(depth, node);
            // reversed so children come off the stack in their stored order
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child));
            }
        }
    }

    /// Number of users below the root.
    pub fn descendant_count(&self) -> u64 {
        let mut count = 0u64;
        self.walk(|depth, _| {
            if depth > 0 {
                count += 1;
            }
        });
        count
    }

    /// Depth of the deepest descendant; 0 for a leaf.
    pub fn max_depth(&self) -> u32 {
        let mut max = 0;
        self.walk(|depth, _| max = max.max(depth));
        max
    }
}

/// Downline counts for one user. The user itself is never counted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferralStats {
    pub direct_referrals: u64,
    pub total_referrals: u64,
    /// Users per depth below the root (1 = direct referrals).
    pub by_depth: BTreeMap<u32, u64>,
}

impl ReferralStats {
    pub fn from_tree(tree: &ReferralTree) -> Self {
        let mut stats = Self::default();
        tree.walk(|depth, _| {
            if depth == 0 {
                return;
            }
            stats.total_referrals += 1;
            if depth == 1 {
                stats.direct_referrals += 1;
            }
            *stats.by_depth.entry(depth).or_insert(0) += 1;
        });
        stats
    }
}

/// One award the user received, joined with the user whose onboarding paid it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EarningsEntry {
    pub referral: Referral,
    /// `None` if the referred user record no longer exists.
    pub referred_user: Option<User>,
}

/// System-wide aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemStats {
    pub total_users: u64,
    pub total_referrals: u64,
    pub total_earnings: u64,
    pub earnings_by_level: EarningsByLevel,
    /// Highest earners first. Ties keep the store's iteration order, which is
    /// not guaranteed to be stable across store implementations.
    pub top_earners: Vec<User>,
}
