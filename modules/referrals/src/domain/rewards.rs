//! Fixed reward table.

use crate::contract::model::ReferralLevel;

pub const LEVEL1_REWARD: u64 = 100;
pub const LEVEL2_REWARD: u64 = 60;
pub const LEVEL3_REWARD: u64 = 40;
/// Paid to every ancestor from level 4 upward.
pub const LEVEL_N_PLUS_REWARD: u64 = 20;

/// Reward paid to an ancestor at `level`.
pub fn reward_for(level: ReferralLevel) -> u64 {
    match level {
        ReferralLevel::Level1 => LEVEL1_REWARD,
        ReferralLevel::Level2 => LEVEL2_REWARD,
        ReferralLevel::Level3 => LEVEL3_REWARD,
        ReferralLevel::LevelNPlus(_) => LEVEL_N_PLUS_REWARD,
    }
}
