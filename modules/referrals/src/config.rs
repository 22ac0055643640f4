use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// How record identifiers are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Uuid,
    /// Counts from 1 per module instance; not for stores shared between
    /// instances.
    Sequential,
}

/// Configuration for the referrals module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferralsConfig {
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,
    #[serde(default = "default_top_earners_limit")]
    pub top_earners_limit: usize,
    #[serde(default = "default_referral_code_length")]
    pub referral_code_length: usize,
    #[serde(default = "default_max_username_length")]
    pub max_username_length: usize,
    #[serde(default)]
    pub id_strategy: IdStrategy,
    /// Capacity of the domain event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ReferralsConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: default_max_chain_depth(),
            top_earners_limit: default_top_earners_limit(),
            referral_code_length: default_referral_code_length(),
            max_username_length: default_max_username_length(),
            id_strategy: IdStrategy::default(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ReferralsConfig {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            max_chain_depth: self.max_chain_depth,
            top_earners_limit: self.top_earners_limit,
            max_username_length: self.max_username_length,
            ..ServiceConfig::default()
        }
    }
}

fn default_max_chain_depth() -> usize {
    1024
}

fn default_top_earners_limit() -> usize {
    10
}

fn default_referral_code_length() -> usize {
    8
}

fn default_max_username_length() -> usize {
    64
}

fn default_event_buffer() -> usize {
    256
}
