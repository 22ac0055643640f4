use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::ReferralsApi,
    error::ReferralsError,
    model::{
        EarningsEntry, NewUser, ReferralOutcome, ReferralStats, ReferralTree, Registration,
        SystemStats, User,
    },
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of the ReferralsApi trait that delegates to the domain service
pub struct ReferralsLocalClient {
    service: Arc<Service>,
}

impl ReferralsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ReferralsApi for ReferralsLocalClient {
    async fn register_user(&self, new_user: NewUser) -> anyhow::Result<Registration> {
        self.service
            .register_user(new_user)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn process_new_referral(
        &self,
        new_user_id: Uuid,
        referral_code: &str,
    ) -> anyhow::Result<ReferralOutcome> {
        self.service
            .process_new_referral(new_user_id, referral_code)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<User> {
        self.service
            .get_user(id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn referral_tree(&self, user_id: Uuid) -> anyhow::Result<Option<ReferralTree>> {
        self.service
            .build_referral_tree(user_id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn referral_stats(&self, user_id: Uuid) -> anyhow::Result<ReferralStats> {
        self.service
            .get_referral_stats(user_id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn upline(&self, user_id: Uuid) -> anyhow::Result<Vec<User>> {
        self.service
            .get_upline(user_id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn earnings_breakdown(&self, user_id: Uuid) -> anyhow::Result<Vec<EarningsEntry>> {
        self.service
            .get_earnings_breakdown(user_id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn network_size(&self, user_id: Uuid) -> anyhow::Result<u64> {
        self.service
            .get_network_size(user_id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn system_stats(&self) -> anyhow::Result<SystemStats> {
        self.service
            .get_system_stats()
            .await
            .map_err(map_domain_error_to_anyhow)
    }
}

/// Map domain errors to contract errors wrapped in anyhow
fn map_domain_error_to_anyhow(domain_error: DomainError) -> anyhow::Error {
    anyhow::Error::new(ReferralsError::from(domain_error))
}
